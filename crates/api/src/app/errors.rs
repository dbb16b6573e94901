use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use nutri_accounts::AccountsError;
use nutri_auth::{AuthError, AuthzError};
use nutri_core::DomainError;
use nutri_infra::LogStoreError;

/// Client-facing message of an error response, kept on the response so the
/// access log can record it without reading the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage(pub String);

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    let message = message.into();
    let mut response = (
        status,
        axum::Json(json!({
            "error": code,
            "message": message,
        })),
    )
        .into_response();
    response.extensions_mut().insert(ErrorMessage(message));
    response
}

/// Registration and account errors.
pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    let status = match &err {
        AuthError::InvalidCredentials
        | AuthError::TenantMismatch
        | AuthError::InvalidRefreshToken
        | AuthError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        AuthError::TenantRequired
        | AuthError::NutricionistaRequired
        | AuthError::TenantNotAllowed
        | AuthError::InvalidTenant
        | AuthError::InvalidNutricionista
        | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::EmailInUse | AuthError::SubdomainInUse | AuthError::NameInUse => StatusCode::CONFLICT,
        AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
        AuthError::Internal(detail) => {
            error!(error = %detail, "internal error");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error");
        }
    };
    json_error(status, err.code(), err.to_string())
}

/// Login errors: a bad tenant or nutritionist reads as a failed login.
pub fn login_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::InvalidTenant | AuthError::InvalidNutricionista => {
            json_error(StatusCode::UNAUTHORIZED, err.code(), err.to_string())
        }
        other => auth_error_to_response(other),
    }
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    match err {
        AuthzError::NotAuthenticated => json_error(StatusCode::UNAUTHORIZED, "not_authenticated", err.to_string()),
        AuthzError::Forbidden(_) => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
    }
}

pub fn accounts_error_to_response(err: AccountsError) -> axum::response::Response {
    match err {
        AccountsError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        AccountsError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        AccountsError::Invalid(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AccountsError::Auth(e) => auth_error_to_response(e),
    }
}

pub fn log_store_error_to_response(err: LogStoreError) -> axum::response::Response {
    error!(error = %err, "access log query failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
}

/// Parse an identifier taken from the path, query or body.
pub fn parse_id<T>(raw: &str, field: &'static str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("{field} is not a valid id")))
}

/// [`parse_id`] for optional fields.
pub fn parse_opt_id<T>(raw: Option<&str>, field: &'static str) -> Result<Option<T>, axum::response::Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.map(|r| parse_id(r, field)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutri_core::UserId;

    #[test]
    fn tenant_errors_depend_on_the_operation() {
        assert_eq!(auth_error_to_response(AuthError::InvalidTenant).status(), StatusCode::BAD_REQUEST);
        assert_eq!(login_error_to_response(AuthError::InvalidTenant).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(login_error_to_response(AuthError::TenantRequired).status(), StatusCode::BAD_REQUEST);
        assert_eq!(login_error_to_response(AuthError::TenantMismatch).status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn conflicts_and_internal_errors() {
        assert_eq!(auth_error_to_response(AuthError::SubdomainInUse).status(), StatusCode::CONFLICT);

        let res = auth_error_to_response(AuthError::internal("connection reset by peer"));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let message = res.extensions().get::<ErrorMessage>().unwrap();
        assert_eq!(message.0, "internal server error");
    }

    #[test]
    fn account_errors() {
        assert_eq!(
            accounts_error_to_response(AccountsError::NotFound("user")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            accounts_error_to_response(AccountsError::Auth(AuthError::EmailInUse)).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn ids_are_validated() {
        assert!(parse_id::<UserId>("nope", "id").is_err());
        let id = UserId::new();
        assert_eq!(parse_id::<UserId>(&id.to_string(), "id").unwrap(), id);
        assert_eq!(parse_opt_id::<UserId>(None, "id").unwrap(), None);
    }
}
