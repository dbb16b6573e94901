//! Persistence boundary for accounts and tenants.
//!
//! The engine only talks to these traits; `memory` provides the in-process
//! implementation used by tests and dev runs, `nutri-infra` the Postgres one.

use std::sync::Arc;

use nutri_core::{TenantId, UserId};

use crate::tenant::{NewTenant, Tenant, TenantUpdate};
use crate::user::{NewUser, User, UserFilter, UserUpdate};

pub mod memory;

pub use memory::{InMemoryCredentialStore, InMemoryTenantStore};

/// Store error.
///
/// Uniqueness violations are reported as dedicated variants so callers can
/// rely on them as the authoritative conflict signal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("email already in use")]
    EmailInUse,
    #[error("subdomain already in use")]
    SubdomainInUse,
    #[error("tenant name already in use")]
    NameInUse,
    #[error("record not found")]
    NotFound,
    #[error("storage error: {0}")]
    Backend(String),
}

/// User account persistence.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Active account with exactly this email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Account by id, regardless of its active flag.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Insert a new account. Fails with [`StoreError::EmailInUse`] if any
    /// account (active or not) already holds the email.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn update_fields(&self, id: UserId, update: UserUpdate) -> Result<User, StoreError>;

    /// Accounts matching `filter`, oldest first.
    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError>;
}

/// Tenant persistence.
#[async_trait::async_trait]
pub trait TenantStore: Send + Sync {
    /// Tenant by subdomain, regardless of its active flag.
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError>;

    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, StoreError>;

    /// Insert a tenant. Subdomain uniqueness is checked before name uniqueness.
    async fn create(&self, tenant: NewTenant) -> Result<Tenant, StoreError>;

    async fn update(&self, id: TenantId, update: TenantUpdate) -> Result<Tenant, StoreError>;

    /// Hard delete. Reserved for rolling back a tenant created moments ago.
    async fn delete(&self, id: TenantId) -> Result<(), StoreError>;

    /// Tenants ordered by creation time.
    async fn list(&self, active_only: bool) -> Result<Vec<Tenant>, StoreError>;
}

#[async_trait::async_trait]
impl<S> CredentialStore for Arc<S>
where
    S: CredentialStore + ?Sized,
{
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        (**self).find_by_email(email).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        (**self).create(user).await
    }

    async fn update_fields(&self, id: UserId, update: UserUpdate) -> Result<User, StoreError> {
        (**self).update_fields(id, update).await
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        (**self).list(filter).await
    }
}

#[async_trait::async_trait]
impl<S> TenantStore for Arc<S>
where
    S: TenantStore + ?Sized,
{
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError> {
        (**self).find_by_subdomain(subdomain).await
    }

    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn create(&self, tenant: NewTenant) -> Result<Tenant, StoreError> {
        (**self).create(tenant).await
    }

    async fn update(&self, id: TenantId, update: TenantUpdate) -> Result<Tenant, StoreError> {
        (**self).update(id, update).await
    }

    async fn delete(&self, id: TenantId) -> Result<(), StoreError> {
        (**self).delete(id).await
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Tenant>, StoreError> {
        (**self).list(active_only).await
    }
}
