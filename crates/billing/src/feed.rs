//! The paginated billing-cycle feed seam.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use cadence_core::{ContractId, TenantId};

use crate::model::{
    BillingCycle, BillingCyclePage, BillingCycleQuery, CycleLookup, CycleSelector, PageInfo,
    SortOrder,
};

/// Paginated access to a contract's billing cycles, as seen by one tenant.
///
/// `Ok(None)` is the platform's explicit absence-of-data signal (no envelope
/// came back). It is distinct from a page with zero edges and from
/// [`CycleLookup::NoSuchCycle`].
#[async_trait]
pub trait BillingCycleFeed: Send + Sync {
    /// Fetch one page of cycles matching `query`.
    async fn page(&self, query: &BillingCycleQuery) -> Result<Option<BillingCyclePage>, FeedError>;

    /// Expected date of the single cycle picked by `selector`.
    async fn cycle_start(
        &self,
        tenant: &TenantId,
        contract: &ContractId,
        selector: CycleSelector,
    ) -> Result<Option<CycleLookup>, FeedError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FeedError {
    #[error("feed transport error: {0}")]
    Transport(String),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

/// In-memory feed for tests/dev.
///
/// Calendars are keyed by tenant and contract, so a contract is invisible to
/// every other shop. Cursors are decimal offsets into the filtered, sorted
/// cycle list. Unknown contracts and contracts marked unavailable answer with
/// absence of data.
#[derive(Debug, Default)]
pub struct InMemoryBillingCycleFeed {
    cycles: RwLock<HashMap<CalendarKey, Vec<BillingCycle>>>,
    unavailable: RwLock<HashSet<CalendarKey>>,
}

type CalendarKey = (TenantId, ContractId);

impl InMemoryBillingCycleFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Replace the calendar of `contract` within `tenant`.
    pub fn insert_cycles(&self, tenant: TenantId, contract: ContractId, cycles: Vec<BillingCycle>) {
        self.cycles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((tenant, contract), cycles);
    }

    /// Make every query for `contract` within `tenant` answer with absence of data.
    pub fn mark_unavailable(&self, tenant: TenantId, contract: ContractId) {
        self.unavailable
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((tenant, contract));
    }

    fn sorted(&self, tenant: &TenantId, contract: &ContractId) -> Option<Vec<BillingCycle>> {
        let key = (tenant.clone(), contract.clone());
        if self
            .unavailable
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
        {
            return None;
        }
        let cycles = self.cycles.read().unwrap_or_else(PoisonError::into_inner);
        let mut found = cycles.get(&key)?.clone();
        found.sort_by_key(|c| c.expected_date);
        Some(found)
    }
}

#[async_trait]
impl BillingCycleFeed for InMemoryBillingCycleFeed {
    async fn page(&self, query: &BillingCycleQuery) -> Result<Option<BillingCyclePage>, FeedError> {
        let Some(mut cycles) = self.sorted(&query.tenant, &query.contract_id) else {
            return Ok(None);
        };
        cycles.retain(|c| query.range.contains(c.expected_date));
        if query.sort_order == SortOrder::Descending {
            cycles.reverse();
        }

        let offset = match &query.cursor {
            None => 0,
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| FeedError::InvalidCursor(raw.clone()))?,
        };
        let size = query.page_size.max(1) as usize;
        let end = offset.saturating_add(size).min(cycles.len());
        let edges = cycles.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let has_next_page = end < cycles.len();

        Ok(Some(BillingCyclePage {
            edges,
            page_info: PageInfo {
                has_next_page,
                end_cursor: has_next_page.then(|| end.to_string()),
            },
        }))
    }

    async fn cycle_start(
        &self,
        tenant: &TenantId,
        contract: &ContractId,
        selector: CycleSelector,
    ) -> Result<Option<CycleLookup>, FeedError> {
        let Some(cycles) = self.sorted(tenant, contract) else {
            return Ok(None);
        };
        let picked = match selector {
            CycleSelector::Index(index) => index
                .checked_sub(1)
                .and_then(|i| cycles.get(i as usize)),
            CycleSelector::Date(at) => cycles
                .iter()
                .rev()
                .find(|c| c.expected_date <= at)
                .or_else(|| cycles.first()),
        };
        Ok(Some(
            picked.map_or(CycleLookup::NoSuchCycle, |c| CycleLookup::Found(c.expected_date)),
        ))
    }
}
