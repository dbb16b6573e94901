use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde_json::Value;

use nutri_accounts::AccountsError;
use nutri_auth::{Registration, Role};
use nutri_core::{TenantId, UserId};

use super::reply;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/super-admins", get(list_super_admins))
        .route("/users/create-super-admin", post(create_super_admin))
        .route("/users/:id/role", patch(update_role))
        .route("/users/:id", axum::routing::delete(delete_user))
        .route("/tenants", get(list_tenants))
        .route("/tenants/:id/stats", get(tenant_stats))
        .route("/tenants/:id/settings", patch(replace_settings))
        .route("/tenants/:id", axum::routing::delete(deactivate_tenant))
        .route("/tenants/:id/activate", patch(activate_tenant))
        .route("/reports/system-overview", get(system_overview))
        .route("/reports/tenant/:id/details", get(tenant_details))
}

fn tenant_id(raw: &str) -> Result<TenantId, axum::response::Response> {
    errors::parse_id(raw, "id")
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    reply(StatusCode::OK, services.accounts.list_active_users().await)
}

pub async fn list_super_admins(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    reply(StatusCode::OK, services.accounts.list_super_admins().await)
}

pub async fn create_super_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateSuperAdminRequest>,
) -> axum::response::Response {
    let registration = Registration::new(body.email, body.password, body.name, Role::SuperAdmin);
    let result = services.auth.create_account(registration).await.map_err(AccountsError::from);
    reply(StatusCode::CREATED, result)
}

pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::GlobalRoleUpdateRequest>,
) -> axum::response::Response {
    let user_id = match errors::parse_id::<UserId>(&id, "id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let change = match body.into_change() {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    reply(
        StatusCode::OK,
        services.accounts.change_role(&caller.actor(), user_id, change).await,
    )
}

/// Soft delete: the account is deactivated.
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match errors::parse_id::<UserId>(&id, "id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(StatusCode::OK, services.accounts.deactivate(&caller.actor(), user_id).await)
}

pub async fn list_tenants(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListTenantsQuery>,
) -> axum::response::Response {
    let include_inactive = query.include_inactive.unwrap_or(true);
    reply(StatusCode::OK, services.accounts.list_tenants(include_inactive).await)
}

pub async fn tenant_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let tenant_id = match tenant_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(StatusCode::OK, services.accounts.tenant_stats(&caller.actor(), tenant_id).await)
}

/// Replaces the settings blob wholesale.
pub async fn replace_settings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let tenant_id = match tenant_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(
        StatusCode::OK,
        services.accounts.update_settings(&caller.actor(), tenant_id, body, false).await,
    )
}

pub async fn deactivate_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let tenant_id = match tenant_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(
        StatusCode::OK,
        services.accounts.set_tenant_active(&caller.actor(), tenant_id, false).await,
    )
}

pub async fn activate_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let tenant_id = match tenant_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(
        StatusCode::OK,
        services.accounts.set_tenant_active(&caller.actor(), tenant_id, true).await,
    )
}

pub async fn system_overview(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    reply(StatusCode::OK, services.accounts.system_overview().await)
}

pub async fn tenant_details(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let tenant_id = match tenant_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(StatusCode::OK, services.accounts.tenant_details(&caller.actor(), tenant_id).await)
}
