//! In-memory stores for tests/dev.
//!
//! Uniqueness is checked and the record inserted under a single write lock,
//! so concurrent creates with the same email/subdomain cannot both succeed.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use nutri_core::{TenantId, UserId};

use super::{CredentialStore, StoreError, TenantStore};
use crate::tenant::{NewTenant, Tenant, TenantUpdate};
use crate::user::{NewUser, User, UserFilter, UserUpdate};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read()
        .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write()
        .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<HashMap<UserId, User>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let map = read(&self.inner)?;
        Ok(map
            .values()
            .find(|u| u.is_active && u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(read(&self.inner)?.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut map = write(&self.inner)?;
        if map.values().any(|u| u.email == user.email) {
            return Err(StoreError::EmailInUse);
        }

        let user = user.into_user(Utc::now());
        map.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_fields(&self, id: UserId, update: UserUpdate) -> Result<User, StoreError> {
        let mut map = write(&self.inner)?;
        if let Some(email) = &update.email {
            if map.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::EmailInUse);
            }
        }

        let user = map.get_mut(&id).ok_or(StoreError::NotFound)?;
        update.apply(user, Utc::now());
        Ok(user.clone())
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let map = read(&self.inner)?;
        let mut users: Vec<User> = map.values().filter(|u| filter.matches(u)).cloned().collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(users)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    inner: RwLock<HashMap<TenantId, Tenant>>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique(
        map: &HashMap<TenantId, Tenant>,
        except: Option<TenantId>,
        subdomain: Option<&str>,
        name: Option<&str>,
    ) -> Result<(), StoreError> {
        let others = || map.values().filter(move |t| Some(t.id) != except);

        if let Some(subdomain) = subdomain {
            if others().any(|t| t.subdomain == subdomain) {
                return Err(StoreError::SubdomainInUse);
            }
        }
        if let Some(name) = name {
            if others().any(|t| t.name == name) {
                return Err(StoreError::NameInUse);
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, StoreError> {
        let map = read(&self.inner)?;
        Ok(map.values().find(|t| t.subdomain == subdomain).cloned())
    }

    async fn find_by_id(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        Ok(read(&self.inner)?.get(&id).cloned())
    }

    async fn create(&self, tenant: NewTenant) -> Result<Tenant, StoreError> {
        let mut map = write(&self.inner)?;
        Self::check_unique(&map, None, Some(&tenant.subdomain), Some(&tenant.name))?;

        let tenant = tenant.into_tenant(Utc::now());
        map.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn update(&self, id: TenantId, update: TenantUpdate) -> Result<Tenant, StoreError> {
        let mut map = write(&self.inner)?;
        Self::check_unique(
            &map,
            Some(id),
            update.subdomain.as_deref(),
            update.name.as_deref(),
        )?;

        let tenant = map.get_mut(&id).ok_or(StoreError::NotFound)?;
        update.apply(tenant, Utc::now());
        Ok(tenant.clone())
    }

    async fn delete(&self, id: TenantId) -> Result<(), StoreError> {
        write(&self.inner)?
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Tenant>, StoreError> {
        let map = read(&self.inner)?;
        let mut tenants: Vec<Tenant> = map
            .values()
            .filter(|t| !active_only || t.is_active)
            .cloned()
            .collect();
        tenants.sort_by_key(|t| (t.created_at, t.id));
        Ok(tenants)
    }
}
