//! Durable-queue delivery endpoint.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use cadence_infra::jobs::DispatchRequest;

use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new().route("/dispatch", post(dispatch))
}

/// `200` when the job resolved (including swallowed failures); any other
/// status asks the queue to redeliver.
pub async fn dispatch(
    Extension(services): Extension<Arc<AppServices>>,
    Json(request): Json<DispatchRequest>,
) -> axum::response::Response {
    let job = request.job_class_name.clone();
    let tenant = request.tenant.clone();

    match services.runner.dispatch(request).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "job": job, "tenant": tenant })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(job = %job, tenant = %tenant, error = %e, "dispatch rejected");
            errors::dispatch_error_to_response(e)
        }
    }
}
