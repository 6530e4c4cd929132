use axum::Router;

pub mod admin;
pub mod contracts;
pub mod jobs;
pub mod system;
pub mod webhooks;

/// Router for all tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/webhooks", webhooks::router())
        .nest("/contracts", contracts::router())
        .nest("/admin", admin::router())
}
