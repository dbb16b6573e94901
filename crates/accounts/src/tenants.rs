//! Tenant administration and per-tenant statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use nutri_auth::tenant::merge_settings;
use nutri_auth::{CredentialStore, PasswordHasher, Role, Tenant, TenantStore, TenantUpdate, TokenSigner, UserFilter};
use nutri_core::TenantId;

use crate::error::missing;
use crate::{AccountService, AccountsError, Actor, policy};

/// Head counts of one clinic. Inactive members count towards `total_users`
/// and their role bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantStats {
    pub id: TenantId,
    pub name: String,
    pub subdomain: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub total_users: usize,
    pub active_users: usize,
    pub nutricionistas: usize,
    pub pacientes: usize,
}

impl<C, T, H, S> AccountService<C, T, H, S>
where
    C: CredentialStore,
    T: TenantStore,
    H: PasswordHasher,
    S: TokenSigner,
{
    pub async fn list_tenants(&self, include_inactive: bool) -> Result<Vec<Tenant>, AccountsError> {
        Ok(self.tenants().list(!include_inactive).await?)
    }

    /// The caller's own clinic.
    pub async fn tenant_info(&self, actor: &Actor) -> Result<Tenant, AccountsError> {
        let tenant_id = actor.require_tenant()?;
        self.tenant(actor, tenant_id).await
    }

    pub async fn tenant(&self, actor: &Actor, tenant_id: TenantId) -> Result<Tenant, AccountsError> {
        policy::ensure_same_tenant(actor, Some(tenant_id))?;
        self.tenants()
            .find_by_id(tenant_id)
            .await?
            .ok_or(AccountsError::NotFound("tenant"))
    }

    pub async fn tenant_stats(&self, actor: &Actor, tenant_id: TenantId) -> Result<TenantStats, AccountsError> {
        let tenant = self.tenant(actor, tenant_id).await?;
        let members = self
            .users()
            .list(&UserFilter::default().in_tenant(tenant_id))
            .await?;

        Ok(TenantStats {
            id: tenant.id,
            name: tenant.name,
            subdomain: tenant.subdomain,
            is_active: tenant.is_active,
            created_at: tenant.created_at,
            total_users: members.len(),
            active_users: members.iter().filter(|u| u.is_active).count(),
            nutricionistas: members.iter().filter(|u| u.role.is_nutritionist()).count(),
            pacientes: members.iter().filter(|u| u.role == Role::Paciente).count(),
        })
    }

    /// Write the settings blob. With `merge` the patch's top-level keys are
    /// laid over the current settings; otherwise the patch replaces them.
    pub async fn update_settings(
        &self,
        actor: &Actor,
        tenant_id: TenantId,
        patch: Value,
        merge: bool,
    ) -> Result<Tenant, AccountsError> {
        if !patch.is_object() {
            return Err(AccountsError::Invalid("settings must be a JSON object".into()));
        }
        let current = self.tenant(actor, tenant_id).await?;
        let settings = if merge {
            merge_settings(&current.settings, patch)
        } else {
            patch
        };

        let tenant = self
            .tenants()
            .update(tenant_id, TenantUpdate::settings(settings))
            .await
            .map_err(missing("tenant"))?;
        info!(tenant_id = %tenant.id, merge, "tenant settings updated");
        Ok(tenant)
    }

    /// Activate or deactivate a clinic. Platform operator only.
    pub async fn set_tenant_active(&self, actor: &Actor, tenant_id: TenantId, active: bool) -> Result<Tenant, AccountsError> {
        if !actor.role.is_super_admin() {
            return Err(AccountsError::Forbidden("only the platform admin can change tenant status".into()));
        }
        let tenant = self
            .tenants()
            .update(tenant_id, TenantUpdate::active(active))
            .await
            .map_err(missing("tenant"))?;
        info!(tenant_id = %tenant.id, active, "tenant status changed");
        Ok(tenant)
    }
}
