//! Contract billing calendars, read through the requesting shop.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::app::{dto, errors, services::AppServices};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/:id/billing-cycles/upcoming", get(upcoming_billing_cycles))
        .route("/:id/billing-cycles/past", get(past_billing_cycles))
}

pub async fn upcoming_billing_cycles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::UpcomingQuery>,
) -> axum::response::Response {
    let contract = match dto::parse_contract_id(&id) {
        Ok(c) => c,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_contract_id", msg),
    };
    let interval = match query.interval() {
        Ok(i) => i,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_interval", msg),
    };

    let result = services
        .resolver
        .upcoming(
            tenant.tenant_id(),
            &contract,
            query.page_size.unwrap_or(dto::UpcomingQuery::DEFAULT_PAGE_SIZE),
            interval,
            query.interval_count.unwrap_or(1),
            query.count.unwrap_or(dto::UpcomingQuery::DEFAULT_COUNT),
        )
        .await;

    match result {
        Ok(cycles) => axum::response::IntoResponse::into_response(Json(cycles)),
        Err(e) => errors::billing_error_to_response(e),
    }
}

pub async fn past_billing_cycles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::PastQuery>,
) -> axum::response::Response {
    let contract = match dto::parse_contract_id(&id) {
        Ok(c) => c,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_contract_id", msg),
    };

    match services.resolver.past_since(tenant.tenant_id(), &contract, query.since).await {
        Ok(past) => axum::response::IntoResponse::into_response(Json(past)),
        Err(e) => errors::billing_error_to_response(e),
    }
}
