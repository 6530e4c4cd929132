use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use cadence_billing::BillingCycleError;
use cadence_infra::jobs::{DispatchError, EnqueueError};

pub fn enqueue_error_to_response(err: EnqueueError) -> axum::response::Response {
    tracing::error!(error = %err, "enqueue failed");
    match err {
        EnqueueError::Unregistered(job) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "unregistered_job",
            format!("job {job} is not registered"),
        ),
        EnqueueError::Scheduler(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "enqueue_failed", e.to_string())
        }
    }
}

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::UnknownJob(name) => json_error(
            StatusCode::NOT_FOUND,
            "unknown_job",
            format!("unknown job class: {name}"),
        ),
        e @ DispatchError::InvalidParameters { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_parameters", e.to_string())
        }
        e @ DispatchError::Failed { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "job_failed", e.to_string())
        }
    }
}

pub fn billing_error_to_response(err: BillingCycleError) -> axum::response::Response {
    match err {
        e @ BillingCycleError::DataUnavailable { .. } => {
            json_error(StatusCode::BAD_GATEWAY, "billing_data_unavailable", e.to_string())
        }
        BillingCycleError::Feed(e) => {
            json_error(StatusCode::BAD_GATEWAY, "billing_feed_error", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
