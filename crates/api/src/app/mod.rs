//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store backends and engines
//! - `routes/`: HTTP handlers, one file per area
//! - `dto.rs`: request DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{authz, middleware};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
///
/// Layers under `/api`, outermost first: token decoding, access logging,
/// then the route guard right before each handler.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let api = routes::router()
        .route_layer(axum::middleware::from_fn(authz::guard))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&services),
            middleware::record_access,
        ))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&services),
            middleware::authenticate,
        ))
        .layer(Extension(services));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest(authz::API_PREFIX, api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
