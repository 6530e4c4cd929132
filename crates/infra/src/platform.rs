//! Commerce-platform collaborator used inside job bodies.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadence_core::{ContractId, CustomerId, OrderId, TenantId};

use crate::jobs::RemoteError;

/// A contract as listed by the newest-first contracts query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSummary {
    pub id: ContractId,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_order_id: Option<OrderId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractsPage {
    pub contracts: Vec<ContractSummary>,
    pub has_next_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_cursor: Option<String>,
}

/// Merchant-level settings stored on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantSettings {
    #[serde(default)]
    pub inventory_notification_frequency: String,
}

#[async_trait]
pub trait CommercePlatform: Send + Sync {
    async fn add_order_tags(
        &self,
        tenant: &TenantId,
        order: &OrderId,
        tags: &[String],
    ) -> Result<(), RemoteError>;

    /// Cheap authenticated query used to check the app is still installed.
    async fn probe_shop(&self, tenant: &TenantId) -> Result<(), RemoteError>;

    async fn contract_customer_id(
        &self,
        tenant: &TenantId,
        contract: &ContractId,
    ) -> Result<CustomerId, RemoteError>;

    /// Newest contracts first. `Ok(None)` when the response carried no data.
    async fn recent_contracts(
        &self,
        tenant: &TenantId,
        cursor: Option<&str>,
    ) -> Result<Option<ContractsPage>, RemoteError>;

    async fn merchant_settings(
        &self,
        tenant: &TenantId,
    ) -> Result<Option<MerchantSettings>, RemoteError>;

    /// One page of contracts in the `FAILED` status.
    async fn failed_contracts(
        &self,
        tenant: &TenantId,
        cursor: Option<&str>,
    ) -> Result<ContractsPage, RemoteError>;

    /// Start a bulk resume of `contracts`; returns the bulk operation id.
    async fn resume_contracts(
        &self,
        tenant: &TenantId,
        contracts: &[ContractId],
    ) -> Result<String, RemoteError>;
}

pub const FAILED_STATUS: &str = "FAILED";
pub const ACTIVE_STATUS: &str = "ACTIVE";
const CONTRACTS_PAGE_SIZE: usize = 50;

/// Call sites of [`CommercePlatform`], for scripting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformCall {
    AddOrderTags,
    ProbeShop,
    ContractCustomerId,
    RecentContracts,
    MerchantSettings,
    FailedContracts,
    ResumeContracts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedOrder {
    pub tenant: TenantId,
    pub order: OrderId,
    pub tags: Vec<String>,
}

#[derive(Debug, Default)]
struct PlatformState {
    tagged: Vec<TaggedOrder>,
    customers: HashMap<ContractId, CustomerId>,
    contracts: HashMap<TenantId, Vec<ContractSummary>>,
    settings: HashMap<TenantId, MerchantSettings>,
    resumed: Vec<(TenantId, Vec<ContractId>)>,
    failures: HashMap<PlatformCall, VecDeque<RemoteError>>,
    calls: Vec<PlatformCall>,
}

/// In-memory platform for tests/dev. Records writes and can be primed with
/// data and scripted failures.
#[derive(Debug, Default)]
pub struct InMemoryCommercePlatform {
    state: Mutex<PlatformState>,
}

impl InMemoryCommercePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `call` fail with `err`. Queued failures are consumed in order.
    pub fn fail_next(&self, call: PlatformCall, err: RemoteError) {
        self.state().failures.entry(call).or_default().push_back(err);
    }

    pub fn set_contract_customer(&self, contract: ContractId, customer: CustomerId) {
        self.state().customers.insert(contract, customer);
    }

    pub fn set_contracts(&self, tenant: TenantId, contracts: Vec<ContractSummary>) {
        self.state().contracts.insert(tenant, contracts);
    }

    pub fn set_merchant_settings(&self, tenant: TenantId, settings: MerchantSettings) {
        self.state().settings.insert(tenant, settings);
    }

    pub fn tagged_orders(&self) -> Vec<TaggedOrder> {
        self.state().tagged.clone()
    }

    /// Contract ids of every bulk resume, per call.
    pub fn resumed(&self) -> Vec<(TenantId, Vec<ContractId>)> {
        self.state().resumed.clone()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state().calls.clone()
    }

    fn begin(&self, call: PlatformCall) -> Result<std::sync::MutexGuard<'_, PlatformState>, RemoteError> {
        let mut state = self.state();
        state.calls.push(call);
        let failure = state.failures.get_mut(&call).and_then(VecDeque::pop_front);
        match failure {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl CommercePlatform for InMemoryCommercePlatform {
    async fn add_order_tags(
        &self,
        tenant: &TenantId,
        order: &OrderId,
        tags: &[String],
    ) -> Result<(), RemoteError> {
        let mut state = self.begin(PlatformCall::AddOrderTags)?;
        state.tagged.push(TaggedOrder {
            tenant: tenant.clone(),
            order: order.clone(),
            tags: tags.to_vec(),
        });
        Ok(())
    }

    async fn probe_shop(&self, _tenant: &TenantId) -> Result<(), RemoteError> {
        self.begin(PlatformCall::ProbeShop).map(drop)
    }

    async fn contract_customer_id(
        &self,
        _tenant: &TenantId,
        contract: &ContractId,
    ) -> Result<CustomerId, RemoteError> {
        let state = self.begin(PlatformCall::ContractCustomerId)?;
        state
            .customers
            .get(contract)
            .cloned()
            .ok_or_else(|| RemoteError::http(404, format!("contract {contract} not found")))
    }

    async fn recent_contracts(
        &self,
        tenant: &TenantId,
        cursor: Option<&str>,
    ) -> Result<Option<ContractsPage>, RemoteError> {
        let state = self.begin(PlatformCall::RecentContracts)?;
        let Some(contracts) = state.contracts.get(tenant) else {
            return Ok(None);
        };

        let mut newest_first = contracts.clone();
        newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Some(offset_page(newest_first, cursor)))
    }

    async fn merchant_settings(
        &self,
        tenant: &TenantId,
    ) -> Result<Option<MerchantSettings>, RemoteError> {
        let state = self.begin(PlatformCall::MerchantSettings)?;
        Ok(state.settings.get(tenant).cloned())
    }

    async fn failed_contracts(
        &self,
        tenant: &TenantId,
        cursor: Option<&str>,
    ) -> Result<ContractsPage, RemoteError> {
        let state = self.begin(PlatformCall::FailedContracts)?;
        let failed = state
            .contracts
            .get(tenant)
            .map(|contracts| {
                contracts
                    .iter()
                    .filter(|c| c.status == FAILED_STATUS)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(offset_page(failed, cursor))
    }

    async fn resume_contracts(
        &self,
        tenant: &TenantId,
        contracts: &[ContractId],
    ) -> Result<String, RemoteError> {
        let mut state = self.begin(PlatformCall::ResumeContracts)?;
        if let Some(stored) = state.contracts.get_mut(tenant) {
            for contract in stored.iter_mut().filter(|c| contracts.contains(&c.id)) {
                contract.status = ACTIVE_STATUS.to_string();
            }
        }
        state.resumed.push((tenant.clone(), contracts.to_vec()));
        Ok(format!("gid://shopify/BulkOperation/{}", state.resumed.len()))
    }
}

/// Page of `contracts` starting at the decimal offset in `cursor`.
fn offset_page(contracts: Vec<ContractSummary>, cursor: Option<&str>) -> ContractsPage {
    let total = contracts.len();
    let offset = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
    let page: Vec<_> = contracts
        .into_iter()
        .skip(offset)
        .take(CONTRACTS_PAGE_SIZE)
        .collect();
    let end = offset + page.len();
    let has_next_page = end < total;

    ContractsPage {
        contracts: page,
        has_next_page,
        end_cursor: has_next_page.then(|| end.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let platform = InMemoryCommercePlatform::new();
        let tenant = TenantId::new("shop.myshopify.com").unwrap();
        platform.fail_next(PlatformCall::ProbeShop, RemoteError::http(401, "unauthorized"));

        assert_eq!(
            platform.probe_shop(&tenant).await,
            Err(RemoteError::http(401, "unauthorized"))
        );
        assert_eq!(platform.probe_shop(&tenant).await, Ok(()));
        assert_eq!(platform.calls(), vec![PlatformCall::ProbeShop; 2]);
    }

    #[tokio::test]
    async fn unknown_contract_customer_is_not_found() {
        let platform = InMemoryCommercePlatform::new();
        let tenant = TenantId::new("shop.myshopify.com").unwrap();
        let err = platform
            .contract_customer_id(&tenant, &ContractId::from_numeric(1))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn failed_contracts_page_and_resume() {
        let platform = InMemoryCommercePlatform::new();
        let tenant = TenantId::new("shop.myshopify.com").unwrap();
        let contracts = (1..=60u64)
            .map(|n| ContractSummary {
                id: ContractId::from_numeric(n),
                status: if n % 2 == 0 { FAILED_STATUS } else { ACTIVE_STATUS }.to_string(),
                created_at: Utc::now(),
                customer_id: None,
                origin_order_id: None,
            })
            .collect();
        platform.set_contracts(tenant.clone(), contracts);

        let page = platform.failed_contracts(&tenant, None).await.unwrap();
        assert_eq!(page.contracts.len(), 30);
        assert!(!page.has_next_page);

        let ids: Vec<_> = page.contracts.iter().map(|c| c.id.clone()).collect();
        platform.resume_contracts(&tenant, &ids).await.unwrap();

        let after = platform.failed_contracts(&tenant, None).await.unwrap();
        assert!(after.contracts.is_empty());
        assert_eq!(platform.resumed(), vec![(tenant, ids)]);
    }
}
