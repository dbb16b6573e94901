//! Access log: one record per API request.
//!
//! Recording is best-effort. The HTTP layer writes through [`AccessLogStore`]
//! after the response is built and only logs a failure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use nutri_core::{AccessLogId, TenantId, UserId};

pub mod memory;

pub use memory::InMemoryAccessLogStore;

/// Value written in place of secrets found in a logged request body.
pub const REDACTED: &str = "[REDACTED]";

/// Lower-cased fragments marking a body key as secret (`password`,
/// `tempPassword`, `refresh_token`, `accessToken`, ...).
const SECRET_MARKERS: [&str; 2] = ["password", "token"];

/// Default page size of the per-user and per-tenant listings.
pub const DEFAULT_LIMIT: usize = 100;

/// Page size of the failed-login listing.
pub const FAILED_LOGINS_LIMIT: usize = 50;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessAction {
    Read,
    Create,
    Update,
    Delete,
    Login,
    Logout,
    Refresh,
    Unknown,
}

impl AccessAction {
    /// Action for a request. The auth endpoints get their own actions, the
    /// rest follow the HTTP method.
    pub fn classify(method: &str, path: &str) -> Self {
        let path = path.split('?').next().unwrap_or_default().trim_end_matches('/');
        if method == "POST" {
            if path.ends_with("/auth/login") {
                return Self::Login;
            }
            if path.ends_with("/auth/logout") {
                return Self::Logout;
            }
            if path.ends_with("/auth/refresh") {
                return Self::Refresh;
            }
        }
        Self::from_method(method)
    }

    pub fn from_method(method: &str) -> Self {
        match method {
            "GET" | "HEAD" => Self::Read,
            "POST" => Self::Create,
            "PUT" | "PATCH" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Refresh => "refresh",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "read" => Self::Read,
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "login" => Self::Login,
            "logout" => Self::Logout,
            "refresh" => Self::Refresh,
            _ => Self::Unknown,
        }
    }
}

/// One recorded request.
///
/// `user_*` fields are `None` for anonymous requests, except `user_email`
/// which falls back to the `email` of a login body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLog {
    pub id: AccessLogId,
    pub user_id: Option<UserId>,
    pub user_email: Option<String>,
    pub user_role: Option<String>,
    pub tenant_id: Option<TenantId>,
    pub action: AccessAction,
    pub resource: String,
    pub method: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub status_code: u16,
    pub response_time_ms: u64,
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate counters over every recorded request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessStats {
    pub total_access: u64,
    pub successful_access: u64,
    pub failed_access: u64,
    pub unique_users_count: u64,
    /// Percentage of successful requests; 0 when nothing was recorded.
    pub success_rate: f64,
}

impl AccessStats {
    pub fn from_counts(total: u64, successful: u64, unique_users: u64) -> Self {
        let success_rate = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64 * 100.0
        };
        Self {
            total_access: total,
            successful_access: successful,
            failed_access: total - successful,
            unique_users_count: unique_users,
            success_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogStoreError {
    #[error("access log storage error: {0}")]
    Backend(String),
}

/// Access-log persistence. Listings are newest first.
#[async_trait::async_trait]
pub trait AccessLogStore: Send + Sync {
    async fn record(&self, entry: AccessLog) -> Result<(), LogStoreError>;

    async fn for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<AccessLog>, LogStoreError>;

    async fn for_tenant(&self, tenant_id: TenantId, limit: usize) -> Result<Vec<AccessLog>, LogStoreError>;

    /// Unsuccessful login attempts.
    async fn failed_logins(&self, limit: usize) -> Result<Vec<AccessLog>, LogStoreError>;

    async fn stats(&self) -> Result<AccessStats, LogStoreError>;
}

#[async_trait::async_trait]
impl<S> AccessLogStore for Arc<S>
where
    S: AccessLogStore + ?Sized,
{
    async fn record(&self, entry: AccessLog) -> Result<(), LogStoreError> {
        (**self).record(entry).await
    }

    async fn for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<AccessLog>, LogStoreError> {
        (**self).for_user(user_id, limit).await
    }

    async fn for_tenant(&self, tenant_id: TenantId, limit: usize) -> Result<Vec<AccessLog>, LogStoreError> {
        (**self).for_tenant(tenant_id, limit).await
    }

    async fn failed_logins(&self, limit: usize) -> Result<Vec<AccessLog>, LogStoreError> {
        (**self).failed_logins(limit).await
    }

    async fn stats(&self) -> Result<AccessStats, LogStoreError> {
        (**self).stats().await
    }
}

/// Copy of a request body with top-level secrets replaced by [`REDACTED`].
pub fn sanitize_body(body: &Value) -> Value {
    match body {
        Value::Object(map) => {
            let mut clean = map.clone();
            for (key, v) in clean.iter_mut() {
                if is_secret_key(key) {
                    *v = Value::String(REDACTED.to_string());
                }
            }
            Value::Object(clean)
        }
        other => other.clone(),
    }
}

fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SECRET_MARKERS.iter().any(|marker| key.contains(marker))
}
