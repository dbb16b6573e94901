use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use nutri_auth::Role;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::{AuthContext, RequestJson};
use crate::middleware::extract_bearer;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/register/super-admin", post(register_super_admin))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    match services
        .auth
        .login(&body.email, &body.password, body.tenant_subdomain.as_deref())
        .await
    {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(e) => errors::login_error_to_response(e),
    }
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    let registration = match body.into_registration() {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match services.auth.register(registration).await {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn register_super_admin(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    let mut registration = match body.into_registration() {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    registration.role = Role::SuperAdmin;
    match services.auth.register(registration).await {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// Token from the JSON body, or from `Authorization: Bearer <refresh>`.
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(body): Extension<RequestJson>,
    headers: HeaderMap,
) -> axum::response::Response {
    let token = body
        .0
        .and_then(|v| serde_json::from_value::<dto::RefreshRequest>(v).ok())
        .and_then(|r| r.refresh_token)
        .or_else(|| extract_bearer(&headers).map(str::to_string));

    let Some(token) = token else {
        return errors::auth_error_to_response(nutri_auth::AuthError::InvalidRefreshToken);
    };
    match services.auth.refresh_token(&token).await {
        Ok(access) => (StatusCode::OK, Json(access)).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<AuthContext>,
) -> axum::response::Response {
    match services.auth.logout(caller.user_id()).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "logged out" }))).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// Identity as stated by the access token.
pub async fn profile(Extension(caller): Extension<AuthContext>) -> axum::response::Response {
    let claims = caller.claims();
    (
        StatusCode::OK,
        Json(json!({
            "id": claims.user_id(),
            "email": claims.payload.email,
            "role": claims.role(),
            "tenantId": claims.tenant_id(),
        })),
    )
        .into_response()
}
