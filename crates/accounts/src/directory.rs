//! Account directory: listing, creating and managing users on behalf of an actor.

use serde::Deserialize;
use tracing::{info, instrument};

use nutri_auth::roles::NUTRICIONISTA_ONLY;
use nutri_auth::{
    AuthError, CredentialStore, PasswordHasher, Registration, Role, TenantStore, TokenSigner, User,
    UserFilter, UserUpdate,
};
use nutri_core::{TenantId, UserId};

use crate::error::missing;
use crate::{AccountService, AccountsError, Actor, policy};

/// A clinic admin inviting a staff nutritionist into its clinic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub crn: Option<String>,
    #[serde(default)]
    pub especialidade: Option<String>,
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub temp_password: Option<String>,
}

/// Target of a role change.
///
/// `tenant_id` moves the user to another clinic (platform operator only);
/// `nutricionista_id` names the responsible nutritionist when the new role
/// is a patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChange {
    pub new_role: Role,
    pub tenant_id: Option<TenantId>,
    pub nutricionista_id: Option<UserId>,
}

impl RoleChange {
    pub fn to(new_role: Role) -> Self {
        Self {
            new_role,
            tenant_id: None,
            nutricionista_id: None,
        }
    }
}

/// Editable profile fields of a clinic member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub crn: Option<String>,
    #[serde(default)]
    pub especialidade: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl<C, T, H, S> AccountService<C, T, H, S>
where
    C: CredentialStore,
    T: TenantStore,
    H: PasswordHasher,
    S: TokenSigner,
{
    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn list_active_users(&self) -> Result<Vec<User>, AccountsError> {
        Ok(self.users().list(&UserFilter::active()).await?)
    }

    pub async fn list_super_admins(&self) -> Result<Vec<User>, AccountsError> {
        let filter = UserFilter::active().with_roles(&[Role::SuperAdmin]);
        Ok(self.users().list(&filter).await?)
    }

    /// Active members of `tenant_id`.
    pub async fn users_in_tenant(&self, actor: &Actor, tenant_id: TenantId) -> Result<Vec<User>, AccountsError> {
        policy::ensure_same_tenant(actor, Some(tenant_id))?;
        Ok(self.users().list(&UserFilter::active().in_tenant(tenant_id)).await?)
    }

    pub async fn patients_in_tenant(&self, actor: &Actor, tenant_id: TenantId) -> Result<Vec<User>, AccountsError> {
        policy::ensure_same_tenant(actor, Some(tenant_id))?;
        let filter = UserFilter::active().in_tenant(tenant_id).with_roles(&[Role::Paciente]);
        Ok(self.users().list(&filter).await?)
    }

    pub async fn nutritionists_in_tenant(&self, actor: &Actor, tenant_id: TenantId) -> Result<Vec<User>, AccountsError> {
        policy::ensure_same_tenant(actor, Some(tenant_id))?;
        let filter = UserFilter::active().in_tenant(tenant_id).with_roles(NUTRICIONISTA_ONLY);
        Ok(self.users().list(&filter).await?)
    }

    /// Patients under the caller's care. The platform operator sees every
    /// active account.
    pub async fn my_patients(&self, actor: &Actor) -> Result<Vec<User>, AccountsError> {
        let filter = match actor.role {
            Role::SuperAdmin => UserFilter::active(),
            Role::NutricionistaAdmin | Role::NutricionistaFuncionario => UserFilter::active()
                .with_roles(&[Role::Paciente])
                .of_nutricionista(actor.id),
            Role::Paciente => return Err(AccountsError::Forbidden("patients have no patients".into())),
        };
        Ok(self.users().list(&filter).await?)
    }

    pub async fn profile(&self, actor: &Actor) -> Result<User, AccountsError> {
        self.load_user(actor.id).await
    }

    pub async fn get_user(&self, actor: &Actor, user_id: UserId) -> Result<User, AccountsError> {
        let user = self.load_user(user_id).await?;
        policy::can_view_user(actor, &user)?;
        Ok(user)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Creation
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an account under the actor's authority. No tokens are issued.
    #[instrument(skip_all, fields(actor = %actor.id, role = %registration.role))]
    pub async fn create_user(&self, actor: &Actor, mut registration: Registration) -> Result<User, AccountsError> {
        policy::can_create_user(actor, registration.role, registration.tenant_id)?;

        if actor.role.is_nutritionist() && registration.role == Role::Paciente {
            registration.nutricionista_id = Some(actor.id);
        }

        let user = self.auth().create_account(registration).await?;
        info!(user_id = %user.id, "account created");
        Ok(user)
    }

    /// Create a nutritionist: staff of `tenant_id` when given, otherwise the
    /// admin of a freshly created clinic.
    pub async fn create_nutricionista(
        &self,
        actor: &Actor,
        mut registration: Registration,
        tenant_id: Option<TenantId>,
    ) -> Result<User, AccountsError> {
        registration.role = match tenant_id {
            Some(_) => Role::NutricionistaFuncionario,
            None => Role::NutricionistaAdmin,
        };
        registration.tenant_id = tenant_id;
        self.create_user(actor, registration).await
    }

    pub async fn invite_nutricionista(&self, actor: &Actor, invitation: Invitation) -> Result<User, AccountsError> {
        let tenant_id = actor.require_tenant()?;
        let password = invitation
            .temp_password
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.auth().config().invite_default_password.clone());

        let mut registration = Registration::new(
            invitation.email,
            password,
            invitation.name,
            Role::NutricionistaFuncionario,
        )
        .in_tenant(tenant_id);
        registration.crn = invitation.crn;
        registration.especialidade = invitation.especialidade;

        self.create_user(actor, registration).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Changes
    // ─────────────────────────────────────────────────────────────────────────

    /// Move a user to another role, keeping the role/tenant invariants.
    #[instrument(skip(self, change), fields(actor = %actor.id, new_role = %change.new_role))]
    pub async fn change_role(&self, actor: &Actor, user_id: UserId, change: RoleChange) -> Result<User, AccountsError> {
        let target = self.load_user(user_id).await?;
        policy::can_change_role(actor, &target, change.new_role)?;

        if change.tenant_id.is_some() && !actor.role.is_super_admin() {
            return Err(AccountsError::Forbidden("only the platform admin can move users between tenants".into()));
        }

        let mut update = UserUpdate {
            role: Some(change.new_role),
            ..UserUpdate::default()
        };

        match change.new_role {
            Role::SuperAdmin => {
                update.tenant_id = Some(None);
                update.nutricionista_id = Some(None);
            }
            Role::NutricionistaAdmin | Role::NutricionistaFuncionario => {
                let tenant_id = change.tenant_id.or(target.tenant_id).ok_or(AuthError::TenantRequired)?;
                self.ensure_active_tenant(tenant_id).await?;
                update.tenant_id = Some(Some(tenant_id));
                update.nutricionista_id = Some(None);
            }
            Role::Paciente => {
                let tenant_id = change.tenant_id.or(target.tenant_id).ok_or(AuthError::TenantRequired)?;
                self.ensure_active_tenant(tenant_id).await?;

                let kept = target.nutricionista_id.filter(|_| target.role == Role::Paciente);
                let acting = Some(actor.id).filter(|_| actor.role.is_nutritionist());
                let nutricionista_id = change
                    .nutricionista_id
                    .or(kept)
                    .or(acting)
                    .ok_or(AuthError::NutricionistaRequired)?;
                if nutricionista_id == target.id {
                    return Err(AuthError::InvalidNutricionista.into());
                }
                self.ensure_nutricionista(nutricionista_id, tenant_id).await?;

                update.tenant_id = Some(Some(tenant_id));
                update.nutricionista_id = Some(Some(nutricionista_id));
                update.crn = Some(None);
                update.especialidade = Some(None);
            }
        }

        let user = self
            .users()
            .update_fields(target.id, update)
            .await
            .map_err(missing("user"))?;
        info!(user_id = %user.id, from = %target.role, to = %user.role, "role changed");
        Ok(user.without_secrets())
    }

    /// Edit a clinic member's profile fields.
    pub async fn update_user(&self, actor: &Actor, user_id: UserId, changes: UserChanges) -> Result<User, AccountsError> {
        let target = self.load_user(user_id).await?;
        policy::ensure_same_tenant(actor, target.tenant_id)?;
        if changes.is_active == Some(false) {
            policy::can_deactivate(actor, &target)?;
        }

        let mut update = UserUpdate {
            is_active: changes.is_active,
            ..UserUpdate::default()
        };
        if let Some(name) = changes.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AccountsError::Invalid("name cannot be empty".into()));
            }
            update.name = Some(name);
        }
        if let Some(email) = changes.email {
            let email = email.trim().to_string();
            match email.split_once('@') {
                Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
                _ => return Err(AccountsError::Invalid("invalid email format".into())),
            }
            update.email = Some(email);
        }
        if changes.crn.is_some() || changes.especialidade.is_some() {
            if !target.role.is_nutritionist() {
                return Err(AccountsError::Invalid("only nutritionists have crn and especialidade".into()));
            }
            update.crn = changes.crn.map(Some);
            update.especialidade = changes.especialidade.map(Some);
        }

        if update.is_empty() {
            return Ok(target);
        }
        let user = self
            .users()
            .update_fields(target.id, update)
            .await
            .map_err(missing("user"))?;
        Ok(user.without_secrets())
    }

    /// Soft-delete an account. Its refresh token stops working at once.
    #[instrument(skip(self), fields(actor = %actor.id))]
    pub async fn deactivate(&self, actor: &Actor, user_id: UserId) -> Result<User, AccountsError> {
        let target = self.load_user(user_id).await?;
        policy::can_deactivate(actor, &target)?;

        let user = self.users().update_fields(target.id, UserUpdate::active(false)).await?;
        info!(user_id = %user.id, "account deactivated");
        Ok(user.without_secrets())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) async fn load_user(&self, user_id: UserId) -> Result<User, AccountsError> {
        self.users()
            .find_by_id(user_id)
            .await?
            .map(User::without_secrets)
            .ok_or(AccountsError::NotFound("user"))
    }

    async fn ensure_active_tenant(&self, tenant_id: TenantId) -> Result<(), AccountsError> {
        match self.tenants().find_by_id(tenant_id).await? {
            Some(t) if t.is_active => Ok(()),
            _ => Err(AuthError::InvalidTenant.into()),
        }
    }

    async fn ensure_nutricionista(&self, nutricionista_id: UserId, tenant_id: TenantId) -> Result<(), AccountsError> {
        match self.users().find_by_id(nutricionista_id).await? {
            Some(n) if n.is_active && n.role.is_nutritionist() && n.in_tenant(tenant_id) => Ok(()),
            _ => Err(AuthError::InvalidNutricionista.into()),
        }
    }
}
