//! `nutri-accounts` — user and tenant administration on top of the auth engine.
//!
//! Everything here acts on behalf of an authenticated [`Actor`]; the
//! hierarchy rules (who may create, change or deactivate whom) live in
//! [`policy`] as pure functions.

use std::sync::Arc;

use nutri_auth::{AuthService, BcryptHasher, CredentialStore, Hs256TokenSigner, PasswordHasher, TenantStore, TokenSigner};

pub mod actor;
pub mod directory;
pub mod error;
pub mod policy;
pub mod reports;
pub mod tenants;

pub use actor::Actor;
pub use directory::{Invitation, RoleChange, UserChanges};
pub use error::AccountsError;
pub use reports::{
    NutricionistaDetail, PatientBrief, PatientDistribution, PatientsPerNutricionista, SystemHealth,
    SystemOverview, TenantDetails, TenantOverview,
};
pub use tenants::TenantStats;

/// Administration service. Cheap to clone; shares the engine it wraps.
pub struct AccountService<C, T, H = BcryptHasher, S = Hs256TokenSigner> {
    auth: Arc<AuthService<C, T, H, S>>,
}

impl<C, T, H, S> Clone for AccountService<C, T, H, S> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
        }
    }
}

impl<C, T, H, S> AccountService<C, T, H, S>
where
    C: CredentialStore,
    T: TenantStore,
    H: PasswordHasher,
    S: TokenSigner,
{
    pub fn new(auth: Arc<AuthService<C, T, H, S>>) -> Self {
        Self { auth }
    }

    pub fn auth(&self) -> &AuthService<C, T, H, S> {
        &self.auth
    }

    fn users(&self) -> &C {
        self.auth.users()
    }

    fn tenants(&self) -> &T {
        self.auth.tenants()
    }
}
