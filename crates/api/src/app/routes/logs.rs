use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;

use nutri_infra::LogStoreError;
use nutri_infra::access_log::{DEFAULT_LIMIT, FAILED_LOGINS_LIMIT};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/my-access", get(my_access))
        .route("/stats", get(stats))
        .route("/failed-logins", get(failed_logins))
        .route("/tenant", get(tenant_access))
}

fn reply<T: Serialize>(result: Result<T, LogStoreError>) -> axum::response::Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => errors::log_store_error_to_response(e),
    }
}

pub async fn my_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Query(query): Query<dto::LimitQuery>,
) -> axum::response::Response {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    reply(services.access_logs.for_user(caller.user_id(), limit).await)
}

pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    reply(services.access_logs.stats().await)
}

pub async fn failed_logins(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    reply(services.access_logs.failed_logins(FAILED_LOGINS_LIMIT).await)
}

pub async fn tenant_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Query(query): Query<dto::LimitQuery>,
) -> axum::response::Response {
    let tenant_id = match caller.actor().require_tenant() {
        Ok(id) => id,
        Err(e) => return errors::accounts_error_to_response(e),
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    reply(services.access_logs.for_tenant(tenant_id, limit).await)
}
