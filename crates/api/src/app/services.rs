//! Service wiring: picks the store backends and builds the engines once.

use std::sync::Arc;

use tracing::info;

use nutri_accounts::AccountService;
use nutri_auth::{
    AuthConfig, AuthError, AuthService, BcryptHasher, CredentialStore, Hs256TokenSigner,
    InMemoryCredentialStore, InMemoryTenantStore, Registration, Role, TenantStore, User,
};
use nutri_infra::{AccessLogStore, InMemoryAccessLogStore, PgAccessLogStore, PgCredentialStore, PgTenantStore, db};

use crate::config::{ServerArgs, SuperAdminSeed};

pub type DynUsers = Arc<dyn CredentialStore>;
pub type DynTenants = Arc<dyn TenantStore>;
pub type DynAccessLogs = Arc<dyn AccessLogStore>;

pub type Auth = AuthService<DynUsers, DynTenants>;
pub type Accounts = AccountService<DynUsers, DynTenants>;

/// Everything a handler can reach.
pub struct AppServices {
    pub auth: Arc<Auth>,
    pub accounts: Accounts,
    pub access_logs: DynAccessLogs,
}

impl AppServices {
    pub fn new(
        users: DynUsers,
        tenants: DynTenants,
        access_logs: DynAccessLogs,
        jwt_secret: &[u8],
        config: AuthConfig,
    ) -> Self {
        let hasher = BcryptHasher::new(config.bcrypt_cost);
        let signer = Hs256TokenSigner::new(jwt_secret);
        let auth = Arc::new(AuthService::new(users, tenants, hasher, signer, config));
        let accounts = AccountService::new(Arc::clone(&auth));
        Self {
            auth,
            accounts,
            access_logs,
        }
    }

    /// Process-local stores; state is lost on restart.
    pub fn in_memory(jwt_secret: &[u8], config: AuthConfig, access_log_limit: usize) -> Self {
        Self::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(InMemoryTenantStore::new()),
            Arc::new(InMemoryAccessLogStore::with_capacity(access_log_limit)),
            jwt_secret,
            config,
        )
    }

    /// Postgres-backed stores. Applies the schema before returning.
    pub async fn postgres(
        database_url: &str,
        max_connections: u32,
        jwt_secret: &[u8],
        config: AuthConfig,
    ) -> Result<Self, sqlx::Error> {
        let pool = db::connect(database_url, max_connections).await?;
        Ok(Self::new(
            Arc::new(PgCredentialStore::new(pool.clone())),
            Arc::new(PgTenantStore::new(pool.clone())),
            Arc::new(PgAccessLogStore::new(pool)),
            jwt_secret,
            config,
        ))
    }

    pub async fn from_args(args: &ServerArgs) -> Result<Self, sqlx::Error> {
        let secret = args.jwt_secret();
        match &args.database_url {
            Some(url) => {
                info!("using postgres stores");
                Self::postgres(url, args.database_max_connections, secret.as_bytes(), args.auth_config()).await
            }
            None => {
                info!(access_log_limit = args.access_log_limit, "using in-memory stores");
                Ok(Self::in_memory(secret.as_bytes(), args.auth_config(), args.access_log_limit))
            }
        }
    }

    /// Create the bootstrap super admin unless the email is already taken.
    ///
    /// Returns the new account, or `None` when it already existed.
    pub async fn ensure_super_admin(&self, seed: &SuperAdminSeed) -> Result<Option<User>, AuthError> {
        let registration = Registration::new(&seed.email, &seed.password, &seed.name, Role::SuperAdmin);
        match self.auth.create_account(registration).await {
            Ok(user) => {
                info!(user_id = %user.id, "super admin created");
                Ok(Some(user))
            }
            Err(AuthError::EmailInUse) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutri_auth::password::DEFAULT_BCRYPT_COST;

    fn seed() -> SuperAdminSeed {
        SuperAdminSeed {
            email: "root@example.com".into(),
            password: "secret123".into(),
            name: "Root".into(),
        }
    }

    #[tokio::test]
    async fn super_admin_bootstrap_is_idempotent() {
        let config = AuthConfig::default().with_bcrypt_cost(4);
        assert_ne!(config.bcrypt_cost, DEFAULT_BCRYPT_COST);
        let services = AppServices::in_memory(b"test-secret", config, 10);

        let created = services.ensure_super_admin(&seed()).await.unwrap().unwrap();
        assert_eq!(created.role, Role::SuperAdmin);
        assert!(created.tenant_id.is_none());

        assert!(services.ensure_super_admin(&seed()).await.unwrap().is_none());
    }
}
