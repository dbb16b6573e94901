//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! | SQLx error | Postgres code | Result |
//! |------------|---------------|--------|
//! | Database, unique violation on `users_email_key` | `23505` | `StoreError::EmailInUse` |
//! | Database, unique violation on `tenants_subdomain_key` | `23505` | `StoreError::SubdomainInUse` |
//! | Database, unique violation on `tenants_name_key` | `23505` | `StoreError::NameInUse` |
//! | Anything else | any | `StoreError::Backend` |
//!
//! Uniqueness is left to the database constraints, so two concurrent inserts
//! of the same email or subdomain cannot both succeed.

use nutri_auth::StoreError;

mod access_logs;
mod tenants;
mod users;

pub use access_logs::PgAccessLogStore;
pub use tenants::PgTenantStore;
pub use users::PgCredentialStore;

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                match db_err.constraint() {
                    Some("users_email_key") => return StoreError::EmailInUse,
                    Some("tenants_subdomain_key") => return StoreError::SubdomainInUse,
                    Some("tenants_name_key") => return StoreError::NameInUse,
                    _ => {}
                }
            }
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        other => StoreError::Backend(format!("sqlx error in {}: {}", operation, other)),
    }
}

/// Column values that do not parse back into domain types.
fn decode_error(column: &str, detail: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: detail.to_string().into(),
    }
}
