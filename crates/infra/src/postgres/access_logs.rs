use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use nutri_core::{AccessLogId, TenantId, UserId};

use crate::access_log::{AccessAction, AccessLog, AccessLogStore, AccessStats, LogStoreError};

const LOG_COLUMNS: &str = "id, user_id, user_email, user_role, tenant_id, action, resource, method, \
     ip_address, user_agent, success, error_message, status_code, response_time_ms, metadata, timestamp";

/// Postgres-backed access log over the `access_logs` table.
#[derive(Debug, Clone)]
pub struct PgAccessLogStore {
    pool: Arc<PgPool>,
}

impl PgAccessLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn fetch(&self, operation: &str, sql: &str, key: Option<uuid::Uuid>, limit: usize) -> Result<Vec<AccessLog>, LogStoreError> {
        let mut query = sqlx::query(sql);
        if let Some(key) = key {
            query = query.bind(key);
        }
        let rows = query
            .bind(limit as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| backend(operation, e))?;

        rows.iter()
            .map(|r| AccessLogRow::from_row(r).map(AccessLog::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| backend(operation, e))
    }
}

fn backend(operation: &str, err: sqlx::Error) -> LogStoreError {
    LogStoreError::Backend(format!("sqlx error in {}: {}", operation, err))
}

#[async_trait::async_trait]
impl AccessLogStore for PgAccessLogStore {
    #[instrument(skip(self, entry), fields(resource = %entry.resource), err)]
    async fn record(&self, entry: AccessLog) -> Result<(), LogStoreError> {
        sqlx::query(
            r#"
            INSERT INTO access_logs (
                id, user_id, user_email, user_role, tenant_id, action, resource, method,
                ip_address, user_agent, success, error_message, status_code,
                response_time_ms, metadata, timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.user_id.map(uuid::Uuid::from))
        .bind(&entry.user_email)
        .bind(&entry.user_role)
        .bind(entry.tenant_id.map(uuid::Uuid::from))
        .bind(entry.action.as_str())
        .bind(&entry.resource)
        .bind(&entry.method)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.success)
        .bind(&entry.error_message)
        .bind(i32::from(entry.status_code))
        .bind(i64::try_from(entry.response_time_ms).unwrap_or(i64::MAX))
        .bind(&entry.metadata)
        .bind(entry.timestamp)
        .execute(&*self.pool)
        .await
        .map_err(|e| backend("record_access", e))?;
        Ok(())
    }

    async fn for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<AccessLog>, LogStoreError> {
        let sql = format!("SELECT {LOG_COLUMNS} FROM access_logs WHERE user_id = $1 ORDER BY timestamp DESC LIMIT $2");
        self.fetch("logs_for_user", &sql, Some(*user_id.as_uuid()), limit).await
    }

    async fn for_tenant(&self, tenant_id: TenantId, limit: usize) -> Result<Vec<AccessLog>, LogStoreError> {
        let sql = format!("SELECT {LOG_COLUMNS} FROM access_logs WHERE tenant_id = $1 ORDER BY timestamp DESC LIMIT $2");
        self.fetch("logs_for_tenant", &sql, Some(*tenant_id.as_uuid()), limit).await
    }

    async fn failed_logins(&self, limit: usize) -> Result<Vec<AccessLog>, LogStoreError> {
        let sql = format!(
            "SELECT {LOG_COLUMNS} FROM access_logs WHERE action = 'login' AND NOT success \
             ORDER BY timestamp DESC LIMIT $1"
        );
        self.fetch("failed_logins", &sql, None, limit).await
    }

    #[instrument(skip(self), err)]
    async fn stats(&self) -> Result<AccessStats, LogStoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE success) AS successful,
                COUNT(DISTINCT user_id) + MAX(CASE WHEN user_id IS NULL THEN 1 ELSE 0 END) AS unique_users
            FROM access_logs
            "#,
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| backend("access_stats", e))?;

        let total: i64 = row.try_get("total").map_err(|e| backend("access_stats", e))?;
        let successful: i64 = row.try_get("successful").map_err(|e| backend("access_stats", e))?;
        let unique: Option<i64> = row.try_get("unique_users").map_err(|e| backend("access_stats", e))?;

        Ok(AccessStats::from_counts(
            total.max(0) as u64,
            successful.max(0) as u64,
            unique.unwrap_or(0).max(0) as u64,
        ))
    }
}

// SQLx row types

#[derive(Debug)]
struct AccessLogRow {
    id: uuid::Uuid,
    user_id: Option<uuid::Uuid>,
    user_email: Option<String>,
    user_role: Option<String>,
    tenant_id: Option<uuid::Uuid>,
    action: String,
    resource: String,
    method: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    success: bool,
    error_message: Option<String>,
    status_code: i32,
    response_time_ms: i64,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for AccessLogRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccessLogRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            user_email: row.try_get("user_email")?,
            user_role: row.try_get("user_role")?,
            tenant_id: row.try_get("tenant_id")?,
            action: row.try_get("action")?,
            resource: row.try_get("resource")?,
            method: row.try_get("method")?,
            ip_address: row.try_get("ip_address")?,
            user_agent: row.try_get("user_agent")?,
            success: row.try_get("success")?,
            error_message: row.try_get("error_message")?,
            status_code: row.try_get("status_code")?,
            response_time_ms: row.try_get("response_time_ms")?,
            metadata: row.try_get("metadata")?,
            timestamp: row.try_get("timestamp")?,
        })
    }
}

impl From<AccessLogRow> for AccessLog {
    fn from(row: AccessLogRow) -> Self {
        AccessLog {
            id: AccessLogId::from_uuid(row.id),
            user_id: row.user_id.map(UserId::from_uuid),
            user_email: row.user_email,
            user_role: row.user_role,
            tenant_id: row.tenant_id.map(TenantId::from_uuid),
            action: AccessAction::parse(&row.action),
            resource: row.resource,
            method: row.method,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            success: row.success,
            error_message: row.error_message,
            status_code: u16::try_from(row.status_code).unwrap_or(0),
            response_time_ms: row.response_time_ms.max(0) as u64,
            metadata: row.metadata,
            timestamp: row.timestamp,
        }
    }
}
