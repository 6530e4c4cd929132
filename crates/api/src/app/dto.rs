use serde::{Deserialize, Serialize};

use cadence_billing::BillingInterval;
use cadence_core::{ContractId, CustomerId, OrderId};
use cadence_infra::jobs::NotificationFrequency;

// -------------------------
// Webhook payloads
// -------------------------
//
// Only the fields the handlers act on; the full body is forwarded as-is.

#[derive(Debug, Deserialize)]
pub struct ContractWebhook {
    pub admin_graphql_api_id: ContractId,
    #[serde(default)]
    pub admin_graphql_api_customer_id: Option<CustomerId>,
    #[serde(default)]
    pub admin_graphql_api_origin_order_id: Option<OrderId>,
}

#[derive(Debug, Deserialize)]
pub struct BillingAttemptWebhook {
    #[serde(default)]
    pub admin_graphql_api_order_id: Option<OrderId>,
}

#[derive(Debug, Deserialize)]
pub struct BillingCycleSkipWebhook {
    pub subscription_contract_id: u64,
    #[serde(default)]
    pub cycle_index: Option<u32>,
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingQuery {
    pub count: Option<usize>,
    pub interval: Option<String>,
    pub interval_count: Option<u32>,
    pub page_size: Option<u32>,
}

impl UpcomingQuery {
    pub const DEFAULT_COUNT: usize = 5;
    pub const DEFAULT_PAGE_SIZE: u32 = 50;

    pub fn interval(&self) -> Result<BillingInterval, String> {
        match self.interval.as_deref() {
            None => Ok(BillingInterval::Month),
            Some(raw) => raw.parse().map_err(|e: cadence_core::DomainError| e.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PastQuery {
    pub since: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
pub struct InventoryEmailTrigger {
    pub frequency: NotificationFrequency,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct EnqueuedResponse {
    pub enqueued: Vec<&'static str>,
}

/// Path segment to contract id: a bare numeric id or a full global id.
pub fn parse_contract_id(raw: &str) -> Result<ContractId, String> {
    match raw.parse::<u64>() {
        Ok(numeric) => Ok(ContractId::from_numeric(numeric)),
        Err(_) => ContractId::new(raw).map_err(|e| e.to_string()),
    }
}
