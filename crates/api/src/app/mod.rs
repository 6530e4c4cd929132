//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: job runner, scheduler selection, resolver
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: webhook payloads and request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    // Tenant-scoped routes: require the shop domain header.
    let scoped = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn(middleware::tenant_middleware));

    // The queue delivers tenant inside the task body.
    let delivery = Router::new()
        .nest("/jobs", routes::jobs::router())
        .layer(Extension(services));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(delivery)
        .merge(scoped)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
