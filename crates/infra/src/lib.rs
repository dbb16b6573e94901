//! Infrastructure layer: Postgres stores, the access log and schema wiring.
//!
//! In-memory account/tenant stores live next to their traits in `nutri-auth`;
//! this crate provides the persistent implementations.

pub mod access_log;
pub mod db;
pub mod postgres;

pub use access_log::{
    AccessAction, AccessLog, AccessLogStore, AccessStats, InMemoryAccessLogStore, LogStoreError,
    sanitize_body,
};
pub use postgres::{PgAccessLogStore, PgCredentialStore, PgTenantStore};
