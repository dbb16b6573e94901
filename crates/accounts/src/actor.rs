use nutri_auth::{Role, TokenClaims};
use nutri_core::{TenantId, UserId};

use crate::AccountsError;

/// The authenticated caller, as stated by its verified access token.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
}

impl Actor {
    pub fn new(id: UserId, role: Role, tenant_id: Option<TenantId>) -> Self {
        Self { id, role, tenant_id }
    }

    /// The caller's tenant, for operations scoped to "my clinic".
    pub fn require_tenant(&self) -> Result<TenantId, AccountsError> {
        self.tenant_id
            .ok_or_else(|| AccountsError::Invalid("user has no tenant".to_string()))
    }
}

impl From<&TokenClaims> for Actor {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            id: claims.user_id(),
            role: claims.role(),
            tenant_id: claims.tenant_id(),
        }
    }
}
