use thiserror::Error;

use nutri_core::DomainError;

use crate::store::StoreError;

/// Authentication engine error.
///
/// Messages are safe to show to clients; internal detail only travels in
/// [`AuthError::Internal`], which the HTTP layer never echoes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("tenant is required for this role")]
    TenantRequired,

    #[error("nutricionista is required for patients")]
    NutricionistaRequired,

    #[error("super admin accounts cannot belong to a tenant")]
    TenantNotAllowed,

    #[error("tenant is invalid or inactive")]
    InvalidTenant,

    #[error("nutricionista is invalid or belongs to another tenant")]
    InvalidNutricionista,

    #[error("user does not belong to this tenant")]
    TenantMismatch,

    #[error("email already in use")]
    EmailInUse,

    #[error("subdomain already in use")]
    SubdomainInUse,

    #[error("tenant name already in use")]
    NameInUse,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable machine-readable code (snake_case).
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::TenantRequired => "tenant_required",
            AuthError::NutricionistaRequired => "nutricionista_required",
            AuthError::TenantNotAllowed => "tenant_not_allowed",
            AuthError::InvalidTenant => "invalid_tenant",
            AuthError::InvalidNutricionista => "invalid_nutricionista",
            AuthError::TenantMismatch => "tenant_mismatch",
            AuthError::EmailInUse => "email_in_use",
            AuthError::SubdomainInUse => "subdomain_in_use",
            AuthError::NameInUse => "name_in_use",
            AuthError::InvalidRefreshToken => "invalid_refresh_token",
            AuthError::NotAuthenticated => "not_authenticated",
            AuthError::Forbidden(_) => "forbidden",
            AuthError::Validation(_) => "validation_error",
            AuthError::Internal(_) => "internal_error",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::EmailInUse => AuthError::EmailInUse,
            StoreError::SubdomainInUse => AuthError::SubdomainInUse,
            StoreError::NameInUse => AuthError::NameInUse,
            StoreError::NotFound => AuthError::internal("record vanished during update"),
            StoreError::Backend(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<DomainError> for AuthError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Forbidden(msg) => AuthError::Forbidden(msg),
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => AuthError::Validation(msg),
        }
    }
}
