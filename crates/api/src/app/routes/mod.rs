use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use nutri_accounts::AccountsError;

use crate::app::errors;

pub mod admin;
pub mod auth;
pub mod logs;
pub mod system;
pub mod tenant_admin;
pub mod users;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/tenant-admin", tenant_admin::router())
        .nest("/admin", admin::router())
        .nest("/logs", logs::router())
}

/// Serialize an account-service result with `status`, or map its error.
fn reply<T: Serialize>(status: StatusCode, result: Result<T, AccountsError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => errors::accounts_error_to_response(e),
    }
}
