//! Tenant-scoped operational triggers.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use cadence_infra::jobs::{
    DisableShopJob, DisableShopPayload, EnqueueInventoryFailureEmailJob, EnqueueOptions,
    EnqueueTransitionFailedContractsToActiveJob, FrequencyPayload, Job, JobKind, JobParameters,
    MonitorPayload, SubscriptionMonitorJob, TransitionPayload,
};

use crate::app::{dto, errors, services::AppServices};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/monitoring/trigger", post(trigger_monitoring))
        .route("/inventory-emails/trigger", post(trigger_inventory_emails))
        .route("/shop/disable", post(disable_shop))
        .route("/migrations/failed-contracts/trigger", post(trigger_failed_contracts))
        .route("/scheduler", get(scheduler))
}

async fn enqueue_one(services: &AppServices, job: JobKind) -> axum::response::Response {
    let name = job.name();
    match services.runner.enqueue(job, EnqueueOptions::default()).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(dto::EnqueuedResponse {
                enqueued: vec![name],
            }),
        )
            .into_response(),
        Err(e) => errors::enqueue_error_to_response(e),
    }
}

pub async fn trigger_monitoring(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    let job = SubscriptionMonitorJob::new(JobParameters::new(
        tenant.tenant_id().clone(),
        MonitorPayload::default(),
    ));
    enqueue_one(&services, job.into()).await
}

pub async fn trigger_inventory_emails(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::InventoryEmailTrigger>,
) -> axum::response::Response {
    let job = EnqueueInventoryFailureEmailJob::new(JobParameters::new(
        tenant.tenant_id().clone(),
        FrequencyPayload {
            frequency: body.frequency,
        },
    ));
    enqueue_one(&services, job.into()).await
}

pub async fn disable_shop(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    let job = DisableShopJob::new(JobParameters::new(
        tenant.tenant_id().clone(),
        DisableShopPayload {},
    ));
    enqueue_one(&services, job.into()).await
}

pub async fn trigger_failed_contracts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    let job = EnqueueTransitionFailedContractsToActiveJob::new(JobParameters::new(
        tenant.tenant_id().clone(),
        TransitionPayload {},
    ));
    enqueue_one(&services, job.into()).await
}

pub async fn scheduler(
    Extension(services): Extension<Arc<AppServices>>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "scheduler": services.runner.scheduler_name(),
        "capabilities": services.runner.capabilities(),
    }))
}
