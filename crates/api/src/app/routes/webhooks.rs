//! Platform webhook receivers.
//!
//! Each receiver only enqueues jobs; the work happens in the jobs.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use cadence_core::{ContractId, TenantId};
use cadence_infra::jobs::{
    CustomerEmailPayload, CustomerSendEmailJob, EnqueueOptions, ExternalWebhookJob,
    FIRST_ORDER_TAGS, Job, JobKind, JobParameters, MerchantEmailPayload, MerchantSendEmailJob,
    RECURRING_ORDER_TAGS, TagOrderPayload, TagSubscriptionOrderJob,
};
use cadence_infra::notify::{CustomerEmailTemplate, ForwardedEvent};

use crate::app::{dto, errors, services::AppServices};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/subscription_contracts/create", post(contract_created))
        .route("/subscription_contracts/activate", post(contract_activated))
        .route("/subscription_contracts/cancel", post(contract_cancelled))
        .route("/subscription_contracts/pause", post(contract_paused))
        .route("/subscription_billing_attempts/success", post(billing_attempt_succeeded))
        .route("/subscription_billing_attempts/failure", post(billing_attempt_failed))
        .route("/subscription_billing_cycles/skip", post(billing_cycle_skipped))
}

fn decode<T: DeserializeOwned>(body: &Value) -> Result<T, axum::response::Response> {
    T::deserialize(body)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_payload", e.to_string()))
}

fn forward(tenant: &TenantId, event: &str, data: Value) -> JobKind {
    ExternalWebhookJob::new(JobParameters::new(tenant.clone(), ForwardedEvent::new(event, data)))
        .into()
}

fn customer_email(
    tenant: &TenantId,
    contract_id: ContractId,
    template: CustomerEmailTemplate,
    customer_id: Option<cadence_core::CustomerId>,
    cycle_index: Option<u32>,
) -> JobKind {
    CustomerSendEmailJob::new(JobParameters::new(
        tenant.clone(),
        CustomerEmailPayload {
            contract_id,
            template,
            customer_id,
            cycle_index,
        },
    ))
    .into()
}

fn tag_order(tenant: &TenantId, order: Option<cadence_core::OrderId>, tags: &[&str]) -> JobKind {
    TagSubscriptionOrderJob::new(JobParameters::new(tenant.clone(), TagOrderPayload::new(order, tags)))
        .into()
}

/// Enqueue in order; the first failure aborts the rest.
async fn enqueue_all(services: &AppServices, topic: &str, jobs: Vec<JobKind>) -> axum::response::Response {
    let mut enqueued = Vec::with_capacity(jobs.len());
    for job in jobs {
        let name = job.name();
        if let Err(e) = services.runner.enqueue(job, EnqueueOptions::default()).await {
            tracing::error!(topic, job = name, "webhook enqueue failed");
            return errors::enqueue_error_to_response(e);
        }
        enqueued.push(name);
    }
    tracing::info!(topic, jobs = ?enqueued, "webhook processed");
    (StatusCode::OK, Json(dto::EnqueuedResponse { enqueued })).into_response()
}

pub async fn contract_created(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let payload: dto::ContractWebhook = match decode(&body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let tenant = tenant.tenant_id();

    let mut jobs = Vec::with_capacity(3);
    if payload.admin_graphql_api_origin_order_id.is_some() {
        jobs.push(customer_email(
            tenant,
            payload.admin_graphql_api_id.clone(),
            CustomerEmailTemplate::NewSubscription,
            payload.admin_graphql_api_customer_id.clone(),
            None,
        ));
    }
    jobs.push(tag_order(
        tenant,
        payload.admin_graphql_api_origin_order_id.clone(),
        FIRST_ORDER_TAGS,
    ));
    jobs.push(forward(tenant, "subscription-created", body));

    enqueue_all(&services, "subscription_contracts/create", jobs).await
}

pub async fn contract_activated(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let jobs = vec![forward(tenant.tenant_id(), "subscription-resumed", body)];
    enqueue_all(&services, "subscription_contracts/activate", jobs).await
}

pub async fn contract_cancelled(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let payload: dto::ContractWebhook = match decode(&body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let tenant = tenant.tenant_id();

    let jobs = vec![
        customer_email(
            tenant,
            payload.admin_graphql_api_id.clone(),
            CustomerEmailTemplate::SubscriptionCancelled,
            payload.admin_graphql_api_customer_id,
            None,
        ),
        MerchantSendEmailJob::new(JobParameters::new(
            tenant.clone(),
            MerchantEmailPayload {
                contract_id: payload.admin_graphql_api_id,
            },
        ))
        .into(),
        forward(tenant, "subscription-canceled", body),
    ];

    enqueue_all(&services, "subscription_contracts/cancel", jobs).await
}

pub async fn contract_paused(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let jobs = vec![forward(tenant.tenant_id(), "subscription-paused", body)];
    enqueue_all(&services, "subscription_contracts/pause", jobs).await
}

pub async fn billing_attempt_succeeded(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let payload: dto::BillingAttemptWebhook = match decode(&body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let tenant = tenant.tenant_id();

    let jobs = vec![
        tag_order(tenant, payload.admin_graphql_api_order_id, RECURRING_ORDER_TAGS),
        forward(tenant, "subscription-billing-attempt-success", body),
    ];
    enqueue_all(&services, "subscription_billing_attempts/success", jobs).await
}

pub async fn billing_attempt_failed(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let jobs = vec![forward(
        tenant.tenant_id(),
        "subscription-billing-attempt-failure",
        body,
    )];
    enqueue_all(&services, "subscription_billing_attempts/failure", jobs).await
}

pub async fn billing_cycle_skipped(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(mut body): Json<Value>,
) -> axum::response::Response {
    let payload: dto::BillingCycleSkipWebhook = match decode(&body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let tenant = tenant.tenant_id();
    let contract_id = ContractId::from_numeric(payload.subscription_contract_id);

    if let Some(object) = body.as_object_mut() {
        object.insert(
            "admin_graphql_api_id".to_string(),
            Value::String(contract_id.to_string()),
        );
    }

    let jobs = vec![
        customer_email(
            tenant,
            contract_id,
            CustomerEmailTemplate::SubscriptionSkipped,
            None,
            payload.cycle_index,
        ),
        forward(tenant, "subscription-billing-cycle-skipped", body),
    ];
    enqueue_all(&services, "subscription_billing_cycles/skip", jobs).await
}
