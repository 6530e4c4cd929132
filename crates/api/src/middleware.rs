use axum::{
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use cadence_core::TenantId;

use crate::app::errors::json_error;
use crate::context::TenantContext;

/// Header naming the shop a webhook or admin call acts for.
pub const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";

pub async fn tenant_middleware(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let tenant_id = extract_tenant(req.headers())?;
    req.extensions_mut().insert(TenantContext::new(tenant_id));
    Ok(next.run(req).await)
}

fn extract_tenant(headers: &HeaderMap) -> Result<TenantId, Response> {
    let header = headers.get(SHOP_DOMAIN_HEADER).ok_or_else(|| {
        json_error(
            StatusCode::UNAUTHORIZED,
            "missing_tenant",
            "X-Shopify-Shop-Domain header is required",
        )
    })?;

    let value = header.to_str().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_tenant",
            "X-Shopify-Shop-Domain header is not valid text",
        )
    })?;

    TenantId::new(value)
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_tenant", e.to_string()))
}
