use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use nutri_auth::{NewTenant, StoreError, Tenant, TenantStore, TenantUpdate};
use nutri_core::{TenantId, UserId};

use super::map_sqlx_error;

const TENANT_COLUMNS: &str = "id, name, subdomain, description, is_active, owner_id, settings, email, \
     phone, address, metadata, created_at, updated_at";

/// Postgres-backed tenant store over the `tenants` table.
#[derive(Debug, Clone)]
pub struct PgTenantStore {
    pool: Arc<PgPool>,
}

impl PgTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn write(&self, operation: &str, sql: &str, tenant: &Tenant) -> Result<u64, StoreError> {
        let result = sqlx::query(sql)
            .bind(tenant.id.as_uuid())
            .bind(&tenant.name)
            .bind(&tenant.subdomain)
            .bind(&tenant.description)
            .bind(tenant.is_active)
            .bind(tenant.owner_id.map(uuid::Uuid::from))
            .bind(&tenant.settings)
            .bind(&tenant.email)
            .bind(&tenant.phone)
            .bind(&tenant.address)
            .bind(&tenant.metadata)
            .bind(tenant.created_at)
            .bind(tenant.updated_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl TenantStore for PgTenantStore {
    #[instrument(skip(self), err)]
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError> {
        let row = sqlx::query(&format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE subdomain = $1"))
            .bind(subdomain)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_subdomain", e))?;

        row.map(|r| TenantRow::from_row(&r).map(Tenant::from))
            .transpose()
            .map_err(|e| map_sqlx_error("find_by_subdomain", e))
    }

    #[instrument(skip(self), fields(tenant_id = %id), err)]
    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        let row = sqlx::query(&format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_tenant", e))?;

        row.map(|r| TenantRow::from_row(&r).map(Tenant::from))
            .transpose()
            .map_err(|e| map_sqlx_error("find_tenant", e))
    }

    #[instrument(skip(self, tenant), fields(subdomain = %tenant.subdomain), err)]
    async fn create(&self, tenant: NewTenant) -> Result<Tenant, StoreError> {
        let tenant = tenant.into_tenant(Utc::now());
        self.write(
            "create_tenant",
            r#"
            INSERT INTO tenants (
                id, name, subdomain, description, is_active, owner_id, settings, email,
                phone, address, metadata, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
            &tenant,
        )
        .await?;
        Ok(tenant)
    }

    #[instrument(skip(self, update), fields(tenant_id = %id), err)]
    async fn update(&self, id: TenantId, update: TenantUpdate) -> Result<Tenant, StoreError> {
        let mut tenant = self.find_by_id(id).await?.ok_or(StoreError::NotFound)?;
        update.apply(&mut tenant, Utc::now());

        let affected = self
            .write(
                "update_tenant",
                r#"
                UPDATE tenants SET
                    name = $2, subdomain = $3, description = $4, is_active = $5,
                    owner_id = $6, settings = $7, email = $8, phone = $9, address = $10,
                    metadata = $11, created_at = $12, updated_at = $13
                WHERE id = $1
                "#,
                &tenant,
            )
            .await?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(tenant)
    }

    #[instrument(skip(self), fields(tenant_id = %id), err)]
    async fn delete(&self, id: TenantId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_tenant", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list(&self, active_only: bool) -> Result<Vec<Tenant>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE is_active OR NOT $1 ORDER BY created_at, id"
        ))
        .bind(active_only)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_tenants", e))?;

        rows.iter()
            .map(|r| TenantRow::from_row(r).map(Tenant::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_tenants", e))
    }
}

// SQLx row types

#[derive(Debug)]
struct TenantRow {
    id: uuid::Uuid,
    name: String,
    subdomain: String,
    description: Option<String>,
    is_active: bool,
    owner_id: Option<uuid::Uuid>,
    settings: Value,
    email: Option<String>,
    phone: Option<String>,
    address: Option<Value>,
    metadata: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for TenantRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TenantRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            subdomain: row.try_get("subdomain")?,
            description: row.try_get("description")?,
            is_active: row.try_get("is_active")?,
            owner_id: row.try_get("owner_id")?,
            settings: row.try_get("settings")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: TenantId::from_uuid(row.id),
            name: row.name,
            subdomain: row.subdomain,
            description: row.description,
            is_active: row.is_active,
            owner_id: row.owner_id.map(UserId::from_uuid),
            settings: row.settings,
            email: row.email,
            phone: row.phone,
            address: row.address,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
