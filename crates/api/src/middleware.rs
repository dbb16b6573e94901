use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, OriginalUri, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use nutri_core::AccessLogId;
use nutri_infra::{AccessAction, AccessLog, sanitize_body};

use crate::app::errors::{self, ErrorMessage};
use crate::app::services::AppServices;
use crate::context::{AuthContext, RequestJson};

/// Largest request body buffered for inspection.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Attach [`AuthContext`] when the request carries a valid access token.
///
/// Missing or invalid tokens are not rejected here; the route guard decides
/// whether the route needs a caller.
pub async fn authenticate(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_bearer(req.headers()) {
        match services.auth.verify_access_token(token) {
            Ok(claims) => {
                req.extensions_mut().insert(AuthContext::new(claims));
            }
            Err(_) => debug!("ignoring invalid bearer token"),
        }
    }
    next.run(req).await
}

/// Record every request in the access log.
///
/// Buffers the body once and exposes it as [`RequestJson`] to the layers
/// below. The write is best-effort: a failing log store never fails the
/// request.
pub async fn record_access(
    State(services): State<Arc<AppServices>>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();

    let method = req.method().as_str().to_string();
    // Nested routers see the path without their prefix.
    let uri = req
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.clone())
        .unwrap_or_else(|| req.uri().clone());
    let resource = uri.path().to_string();
    let query = uri.query().map(str::to_string);
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let ip_address = client_ip(req.headers()).or(peer);
    let user_agent = header_value(req.headers(), header::USER_AGENT.as_str());
    let caller = req.extensions().get::<AuthContext>().cloned();

    let (parts, body) = req.into_parts();
    let (response, body_json) = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => {
            let body_json = serde_json::from_slice(&bytes).ok();
            let mut req = Request::from_parts(parts, Body::from(bytes));
            req.extensions_mut().insert(RequestJson(body_json.clone()));
            (next.run(req).await, RequestJson(body_json))
        }
        Err(_) => (
            errors::json_error(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", "request body too large"),
            RequestJson::default(),
        ),
    };

    let status = response.status();
    let success = status.as_u16() < 400;
    let error_message = if success {
        None
    } else {
        response
            .extensions()
            .get::<ErrorMessage>()
            .map(|m| m.0.clone())
            .or_else(|| status.canonical_reason().map(str::to_string))
    };

    let entry = AccessLog {
        id: AccessLogId::new(),
        user_id: caller.as_ref().map(AuthContext::user_id),
        user_email: caller
            .as_ref()
            .map(|c| c.email().to_string())
            .or_else(|| body_json.str_field("email").map(str::to_string)),
        user_role: caller.as_ref().map(|c| c.claims().role().as_str().to_string()),
        tenant_id: caller.as_ref().and_then(|c| c.claims().tenant_id()),
        action: AccessAction::classify(&method, &resource),
        resource,
        method,
        ip_address,
        user_agent,
        success,
        error_message,
        status_code: status.as_u16(),
        response_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        metadata: json!({
            "body": body_json.0.as_ref().map(sanitize_body),
            "query": query,
        }),
        timestamp: Utc::now(),
    };

    if let Err(e) = services.access_logs.record(entry).await {
        warn!(error = %e, "failed to record access log");
    }

    response
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Client address from proxy headers: first `x-forwarded-for` hop, then
/// `x-real-ip`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .or_else(|| header_value(headers, "x-real-ip"))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
