//! Authentication engine: credentials, sessions, registration.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use nutri_core::{TenantId, UserId};

use crate::config::AuthConfig;
use crate::password::{BcryptHasher, PasswordHasher};
use crate::registration::{Registration, check_role_invariants};
use crate::store::{CredentialStore, StoreError, TenantStore};
use crate::tenant::{NewTenant, Tenant, TenantUpdate, derive_subdomain};
use crate::token::{
    Hs256TokenSigner, TokenClaims, TokenKind, TokenPayload, TokenSigner, digests_match,
    hash_refresh_token,
};
use crate::user::{NewUser, User, UserSummary, UserUpdate};
use crate::{AuthError, Role};

/// Tokens handed out by login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

/// Result of a refresh: a new access token only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    pub access_token: String,
}

pub struct AuthService<C, T, H = BcryptHasher, S = Hs256TokenSigner> {
    users: C,
    tenants: T,
    hasher: H,
    signer: S,
    config: AuthConfig,
    /// Digest checked when the email is unknown, so both misses cost one verify.
    decoy_digest: OnceCell<String>,
}

impl<C, T, H, S> AuthService<C, T, H, S>
where
    C: CredentialStore,
    T: TenantStore,
    H: PasswordHasher,
    S: TokenSigner,
{
    pub fn new(users: C, tenants: T, hasher: H, signer: S, config: AuthConfig) -> Self {
        Self {
            users,
            tenants,
            hasher,
            signer,
            config,
            decoy_digest: OnceCell::new(),
        }
    }

    pub fn users(&self) -> &C {
        &self.users
    }

    pub fn tenants(&self) -> &T {
        &self.tenants
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Credentials
    // ─────────────────────────────────────────────────────────────────────────

    /// Check email/password and the tenant the caller is logging into.
    ///
    /// Returns the account with its secrets blanked.
    pub async fn validate_credentials(
        &self,
        email: &str,
        password: &str,
        tenant_subdomain: Option<&str>,
    ) -> Result<User, AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            let decoy = self
                .decoy_digest
                .get_or_try_init(|| self.hasher.hash("decoy-password"))
                .await?;
            // Result ignored: an unknown email fails whatever the password.
            let _ = self.hasher.verify(password, decoy).await;
            return Err(AuthError::InvalidCredentials);
        };

        let matches = match self.hasher.verify(password, &user.password_hash).await {
            Ok(m) => m,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "stored password digest is unusable");
                false
            }
        };
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        if user.role.requires_tenant() {
            let subdomain = tenant_subdomain
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or(AuthError::TenantRequired)?;

            let tenant = self
                .tenants
                .find_by_subdomain(subdomain)
                .await?
                .filter(|t| t.is_active)
                .ok_or(AuthError::InvalidTenant)?;

            if !user.in_tenant(tenant.id) {
                return Err(AuthError::TenantMismatch);
            }
        }

        Ok(user.without_secrets())
    }

    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        tenant_subdomain: Option<&str>,
    ) -> Result<AuthSession, AuthError> {
        let user = self.validate_credentials(email, password, tenant_subdomain).await?;

        if let Err(e) = self
            .users
            .update_fields(user.id, UserUpdate::last_login(Utc::now()))
            .await
        {
            warn!(user_id = %user.id, error = %e, "failed to record last login");
        }

        let session = self.issue_session(&user).await?;
        info!(user_id = %user.id, role = %user.role, "login succeeded");
        Ok(session)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an account and log it in.
    #[instrument(skip_all, fields(role = %registration.role))]
    pub async fn register(&self, registration: Registration) -> Result<AuthSession, AuthError> {
        let user = self.create_account(registration).await?;
        let session = self.issue_session(&user).await?;
        info!(user_id = %user.id, "registration succeeded");
        Ok(session)
    }

    /// Create an account under the registration rules without issuing tokens.
    ///
    /// A clinic admin registering without a tenant gets one created first; if
    /// the account then cannot be stored, that tenant is removed again.
    pub async fn create_account(&self, registration: Registration) -> Result<User, AuthError> {
        let reg = registration.normalized()?;
        check_role_invariants(reg.role, reg.tenant_id.is_some(), reg.nutricionista_id.is_some())?;

        if self.users.find_by_email(&reg.email).await?.is_some() {
            return Err(AuthError::EmailInUse);
        }

        let (tenant_id, created_tenant) = self.resolve_tenant(&reg).await?;

        let password_hash = match self.hasher.hash(&reg.password).await {
            Ok(h) => h,
            Err(e) => {
                self.roll_back_tenant(created_tenant.as_ref()).await;
                return Err(e);
            }
        };

        let new_user = NewUser {
            email: reg.email,
            password_hash,
            name: reg.name,
            role: reg.role,
            tenant_id,
            nutricionista_id: reg.nutricionista_id,
            crn: reg.crn,
            especialidade: reg.especialidade,
            metadata: json!({}),
        };

        let user = match self.users.create(new_user).await {
            Ok(u) => u,
            Err(e) => {
                self.roll_back_tenant(created_tenant.as_ref()).await;
                return Err(e.into());
            }
        };

        if let Some(tenant) = &created_tenant {
            if let Err(e) = self.tenants.update(tenant.id, TenantUpdate::owner(user.id)).await {
                warn!(tenant_id = %tenant.id, user_id = %user.id, error = %e, "failed to back-fill tenant owner");
            }
        }

        Ok(user.without_secrets())
    }

    /// Resolve (or, for a clinic admin without one, create) the account's tenant.
    async fn resolve_tenant(&self, reg: &Registration) -> Result<(Option<TenantId>, Option<Tenant>), AuthError> {
        match reg.role {
            Role::SuperAdmin => Ok((None, None)),
            Role::NutricionistaAdmin if reg.tenant_id.is_none() => {
                let tenant = self.create_clinic(reg).await?;
                Ok((Some(tenant.id), Some(tenant)))
            }
            Role::NutricionistaAdmin | Role::NutricionistaFuncionario => {
                let tenant_id = reg.tenant_id.ok_or(AuthError::TenantRequired)?;
                self.active_tenant(tenant_id).await?;
                Ok((Some(tenant_id), None))
            }
            Role::Paciente => {
                let tenant_id = reg.tenant_id.ok_or(AuthError::TenantRequired)?;
                let nutricionista_id = reg.nutricionista_id.ok_or(AuthError::NutricionistaRequired)?;
                self.active_tenant(tenant_id).await?;
                self.check_nutricionista(nutricionista_id, tenant_id).await?;
                Ok((Some(tenant_id), None))
            }
        }
    }

    async fn active_tenant(&self, tenant_id: TenantId) -> Result<Tenant, AuthError> {
        self.tenants
            .find_by_id(tenant_id)
            .await?
            .filter(|t| t.is_active)
            .ok_or(AuthError::InvalidTenant)
    }

    async fn check_nutricionista(&self, nutricionista_id: UserId, tenant_id: TenantId) -> Result<(), AuthError> {
        match self.users.find_by_id(nutricionista_id).await? {
            Some(n) if n.is_active && n.role.is_nutritionist() && n.in_tenant(tenant_id) => Ok(()),
            _ => Err(AuthError::InvalidNutricionista),
        }
    }

    async fn create_clinic(&self, reg: &Registration) -> Result<Tenant, AuthError> {
        let subdomain = match &reg.tenant_subdomain {
            Some(s) => s.clone(),
            None => derive_subdomain(&reg.email),
        };
        if subdomain.is_empty() {
            return Err(AuthError::validation("cannot derive a subdomain from this email"));
        }

        // Reported before the insert so a derived name equal to a taken
        // subdomain never surfaces as `NameInUse`.
        if self.tenants.find_by_subdomain(&subdomain).await?.is_some() {
            return Err(AuthError::SubdomainInUse);
        }

        // Tenant names are unique too; the fresh subdomain is the only
        // derived value guaranteed not to collide.
        let name = reg.tenant_name.clone().unwrap_or_else(|| subdomain.clone());
        let tenant = self
            .tenants
            .create(NewTenant {
                name,
                subdomain,
                description: reg.tenant_description.clone(),
                owner_id: None,
                settings: json!({}),
                email: Some(reg.email.clone()),
                phone: None,
                address: None,
            })
            .await?;

        info!(tenant_id = %tenant.id, subdomain = %tenant.subdomain, "tenant created for new clinic admin");
        Ok(tenant)
    }

    async fn roll_back_tenant(&self, tenant: Option<&Tenant>) {
        let Some(tenant) = tenant else { return };
        match self.tenants.delete(tenant.id).await {
            Ok(()) | Err(StoreError::NotFound) => {}
            Err(e) => warn!(tenant_id = %tenant.id, error = %e, "failed to roll back auto-created tenant"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tokens
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue an access token from a verified refresh token.
    ///
    /// Every failure (bad signature, expiry, unknown or inactive user,
    /// revoked or replaced token) collapses into `InvalidRefreshToken`.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AccessToken, AuthError> {
        let claims = self
            .signer
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        let user = self
            .users
            .find_by_id(claims.user_id())
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::InvalidRefreshToken)?;

        let presented = hash_refresh_token(refresh_token);
        match &user.refresh_token_hash {
            Some(stored) if digests_match(stored, &presented) => {}
            _ => return Err(AuthError::InvalidRefreshToken),
        }

        let access_token = self.sign(&user, TokenKind::Access)?;
        Ok(AccessToken { access_token })
    }

    /// Revoke the stored refresh token. Calling it again is a no-op.
    pub async fn logout(&self, user_id: UserId) -> Result<(), AuthError> {
        match self
            .users
            .update_fields(user_id, UserUpdate::refresh_token(None))
            .await
        {
            Ok(_) | Err(StoreError::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify a bearer access token.
    pub fn verify_access_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.signer
            .verify(token, TokenKind::Access)
            .map_err(|_| AuthError::NotAuthenticated)
    }

    async fn issue_session(&self, user: &User) -> Result<AuthSession, AuthError> {
        let access_token = self.sign(user, TokenKind::Access)?;
        let refresh_token = self.sign(user, TokenKind::Refresh)?;

        self.users
            .update_fields(
                user.id,
                UserUpdate::refresh_token(Some(hash_refresh_token(&refresh_token))),
            )
            .await?;

        Ok(AuthSession {
            access_token,
            refresh_token,
            user: user.summary(),
        })
    }

    fn sign(&self, user: &User, kind: TokenKind) -> Result<String, AuthError> {
        let payload = TokenPayload {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            tenant_id: user.tenant_id,
        };
        let ttl = match kind {
            TokenKind::Access => self.config.access_token_ttl,
            TokenKind::Refresh => self.config.refresh_token_ttl,
        };
        self.signer
            .sign(&payload, kind, ttl)
            .map_err(|e| AuthError::internal(e.to_string()))
    }
}
