use thiserror::Error;

use nutri_auth::{AuthError, StoreError};
use nutri_core::DomainError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountsError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<StoreError> for AccountsError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => AccountsError::NotFound("record"),
            other => AccountsError::Auth(other.into()),
        }
    }
}

impl From<DomainError> for AccountsError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Forbidden(msg) => AccountsError::Forbidden(msg),
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => AccountsError::Invalid(msg),
        }
    }
}

/// Store error mapper naming the missing record.
pub(crate) fn missing(what: &'static str) -> impl FnOnce(StoreError) -> AccountsError {
    move |e| match e {
        StoreError::NotFound => AccountsError::NotFound(what),
        other => other.into(),
    }
}
