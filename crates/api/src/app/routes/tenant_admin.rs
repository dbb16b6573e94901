//! Clinic administration for the caller's own tenant.
//!
//! The platform admin has no tenant of its own and names one with
//! `?tenantId=`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde_json::Value;

use nutri_accounts::{Invitation, UserChanges};
use nutri_core::{TenantId, UserId};

use super::reply;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/nutricionistas", get(list_nutricionistas))
        .route("/patients", get(list_patients))
        .route("/invite-nutricionista", post(invite_nutricionista))
        .route("/users/:id/role", patch(change_role))
        .route("/users/:id", patch(update_user).delete(remove_user))
        .route("/tenant/info", get(tenant_info))
        .route("/tenant/stats", get(tenant_stats))
        .route("/tenant/settings", patch(update_settings))
        .route("/reports/overview", get(overview_report))
        .route("/reports/patients-distribution", get(patients_distribution))
}

/// Tenant the request acts on.
fn scoped_tenant(caller: &AuthContext, query: &dto::TenantQuery) -> Result<TenantId, axum::response::Response> {
    match (caller.claims().tenant_id(), query.tenant_id.as_deref()) {
        (Some(own), _) => Ok(own),
        (None, Some(raw)) => errors::parse_id(raw, "tenantId"),
        (None, None) => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "tenant_required",
            "tenantId is required for users without a tenant",
        )),
    }
}

fn user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    errors::parse_id(raw, "id")
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Query(query): Query<dto::TenantQuery>,
) -> axum::response::Response {
    let tenant_id = match scoped_tenant(&caller, &query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(StatusCode::OK, services.accounts.users_in_tenant(&caller.actor(), tenant_id).await)
}

pub async fn list_nutricionistas(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Query(query): Query<dto::TenantQuery>,
) -> axum::response::Response {
    let tenant_id = match scoped_tenant(&caller, &query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(
        StatusCode::OK,
        services.accounts.nutritionists_in_tenant(&caller.actor(), tenant_id).await,
    )
}

pub async fn list_patients(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Query(query): Query<dto::TenantQuery>,
) -> axum::response::Response {
    let tenant_id = match scoped_tenant(&caller, &query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(StatusCode::OK, services.accounts.patients_in_tenant(&caller.actor(), tenant_id).await)
}

pub async fn invite_nutricionista(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Json(body): Json<Invitation>,
) -> axum::response::Response {
    reply(
        StatusCode::CREATED,
        services.accounts.invite_nutricionista(&caller.actor(), body).await,
    )
}

pub async fn change_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RoleUpdateRequest>,
) -> axum::response::Response {
    let (user_id, change) = match (user_id(&id), body.into_change()) {
        (Ok(u), Ok(c)) => (u, c),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    reply(
        StatusCode::OK,
        services.accounts.change_role(&caller.actor(), user_id, change).await,
    )
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<UserChanges>,
) -> axum::response::Response {
    let user_id = match user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(
        StatusCode::OK,
        services.accounts.update_user(&caller.actor(), user_id, body).await,
    )
}

/// Deactivates; accounts are never physically deleted.
pub async fn remove_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(StatusCode::OK, services.accounts.deactivate(&caller.actor(), user_id).await)
}

pub async fn tenant_info(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Query(query): Query<dto::TenantQuery>,
) -> axum::response::Response {
    let tenant_id = match scoped_tenant(&caller, &query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(StatusCode::OK, services.accounts.tenant(&caller.actor(), tenant_id).await)
}

pub async fn tenant_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Query(query): Query<dto::TenantQuery>,
) -> axum::response::Response {
    let tenant_id = match scoped_tenant(&caller, &query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(StatusCode::OK, services.accounts.tenant_stats(&caller.actor(), tenant_id).await)
}

/// Lays the body's top-level keys over the current settings.
pub async fn update_settings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let actor = caller.actor();
    let tenant_id = match actor.require_tenant() {
        Ok(id) => id,
        Err(e) => return errors::accounts_error_to_response(e),
    };
    reply(
        StatusCode::OK,
        services.accounts.update_settings(&actor, tenant_id, body, true).await,
    )
}

pub async fn overview_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Query(query): Query<dto::TenantQuery>,
) -> axum::response::Response {
    let tenant_id = match scoped_tenant(&caller, &query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(StatusCode::OK, services.accounts.tenant_overview(&caller.actor(), tenant_id).await)
}

pub async fn patients_distribution(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Query(query): Query<dto::TenantQuery>,
) -> axum::response::Response {
    let tenant_id = match scoped_tenant(&caller, &query) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(
        StatusCode::OK,
        services.accounts.patients_distribution(&caller.actor(), tenant_id).await,
    )
}
