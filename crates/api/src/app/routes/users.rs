use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, patch, post},
};

use nutri_accounts::Invitation;
use nutri_core::{TenantId, UserId};

use super::reply;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/by-tenant/:tenantId", get(users_by_tenant))
        .route("/patients/my", get(my_patients))
        .route("/profile", get(profile))
        .route("/nutricionista", post(create_nutricionista))
        .route("/invite-nutricionista", post(invite_nutricionista))
        .route("/tenant/:tenantId/nutricionistas", get(tenant_nutricionistas))
        .route("/:id", get(get_user))
        .route("/:id/role", patch(change_role))
        .route("/:id/deactivate", patch(deactivate_user))
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    reply(StatusCode::OK, services.accounts.list_active_users().await)
}

pub async fn users_by_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(tenant_id): Path<String>,
) -> axum::response::Response {
    let tenant_id = match errors::parse_id::<TenantId>(&tenant_id, "tenantId") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(StatusCode::OK, services.accounts.users_in_tenant(&caller.actor(), tenant_id).await)
}

pub async fn my_patients(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
) -> axum::response::Response {
    reply(StatusCode::OK, services.accounts.my_patients(&caller.actor()).await)
}

pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
) -> axum::response::Response {
    reply(StatusCode::OK, services.accounts.profile(&caller.actor()).await)
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = match errors::parse_id::<UserId>(&id, "id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(StatusCode::OK, services.accounts.get_user(&caller.actor(), user_id).await)
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    let registration = match body.into_registration() {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    reply(
        StatusCode::CREATED,
        services.accounts.create_user(&caller.actor(), registration).await,
    )
}

/// With `?tenantId=` the nutritionist joins that clinic as staff; without it
/// a new clinic is created with them as admin.
pub async fn create_nutricionista(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Query(query): Query<dto::TenantQuery>,
    Json(body): Json<dto::CreateNutricionistaRequest>,
) -> axum::response::Response {
    let tenant_id = match errors::parse_opt_id::<TenantId>(query.tenant_id.as_deref(), "tenantId") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(
        StatusCode::CREATED,
        services
            .accounts
            .create_nutricionista(&caller.actor(), body.into_registration(), tenant_id)
            .await,
    )
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

pub async fn tenant_nutricionistas(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(tenant_id): Path<String>,
) -> axum::response::Response {
    let tenant_id = match errors::parse_id::<TenantId>(&tenant_id, "tenantId") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    reply(
        StatusCode::OK,
        services.accounts.nutritionists_in_tenant(&caller.actor(), tenant_id).await,
    )
}

pub async fn change_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RoleUpdateRequest>,
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

pub async fn deactivate_user(
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
