//! Upcoming, past and failed views of a contract's billing calendar.
//!
//! All views are computed fresh from the feed on every call. Classification is
//! relative to an evaluation instant `now`; the `*_at` variants take it
//! explicitly, the plain variants use the wall clock.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use tracing::{debug, error, instrument};

use cadence_core::{ContractId, TenantId};

use crate::feed::{BillingCycleFeed, FeedError};
use crate::model::{
    BillingCycle, BillingCycleQuery, BillingInterval, CycleLookup, CycleSelector, DateRange,
    OrderRef, SortOrder,
};

#[derive(Debug, thiserror::Error)]
pub enum BillingCycleError {
    #[error("Failed to find SubscriptionBillingCycles for {contract} on {tenant} ({query})")]
    DataUnavailable {
        query: &'static str,
        tenant: TenantId,
        contract: ContractId,
    },
    #[error(transparent)]
    Feed(#[from] FeedError),
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    /// How far past `now` the past-cycle walk reaches, so fulfilled cycles
    /// dated in the future are still reported.
    pub past_lookahead: Duration,
    pub past_page_size: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            past_lookahead: Duration::days(365),
            past_page_size: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingBillingCycle {
    pub expected_date: DateTime<Utc>,
    pub skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PastBillingCycle {
    pub expected_date: DateTime<Utc>,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedBillingCycle {
    pub expected_date: DateTime<Utc>,
    pub processing_error_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PastBillingCycles {
    pub past_billing_cycles: Vec<PastBillingCycle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_billing_cycle: Option<FailedBillingCycle>,
}

/// Walks a [`BillingCycleFeed`] and applies the windowing rules.
///
/// Holds no mutable state; concurrent calls are independent page walks.
#[derive(Clone)]
pub struct BillingCycleWindowResolver {
    feed: Arc<dyn BillingCycleFeed>,
    config: ResolverConfig,
}

impl BillingCycleWindowResolver {
    pub fn new(feed: Arc<dyn BillingCycleFeed>) -> Self {
        Self::with_config(feed, ResolverConfig::default())
    }

    pub fn with_config(feed: Arc<dyn BillingCycleFeed>, config: ResolverConfig) -> Self {
        Self { feed, config }
    }

    pub async fn upcoming(
        &self,
        tenant: &TenantId,
        contract: &ContractId,
        page_size: u32,
        interval: BillingInterval,
        interval_count: u32,
        count: usize,
    ) -> Result<Vec<UpcomingBillingCycle>, BillingCycleError> {
        self.upcoming_at(tenant, contract, page_size, interval, interval_count, count, Utc::now())
            .await
    }

    /// The next `count` cycles that have not been purchased yet, skipped ones
    /// included, in ascending date order.
    #[instrument(skip(self, tenant, contract), fields(tenant = %tenant, contract = %contract), err)]
    #[allow(clippy::too_many_arguments)]
    pub async fn upcoming_at(
        &self,
        tenant: &TenantId,
        contract: &ContractId,
        page_size: u32,
        interval: BillingInterval,
        interval_count: u32,
        count: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<UpcomingBillingCycle>, BillingCycleError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let span = u32::try_from(count)
            .unwrap_or(u32::MAX)
            .saturating_add(1)
            .saturating_mul(interval_count);
        let range = DateRange {
            start: start_of_day(now),
            end: interval.advance(now, span),
        };

        let mut upcoming = Vec::with_capacity(count);
        let scope = (tenant, contract);
        self.walk(scope, "upcoming", page_size, SortOrder::Ascending, range, |cycle| {
            if !cycle.is_fulfilled() {
                upcoming.push(UpcomingBillingCycle {
                    expected_date: cycle.expected_date,
                    skipped: cycle.skipped,
                });
            }
            upcoming.len() < count
        })
        .await?;

        Ok(upcoming)
    }

    pub async fn past_since(
        &self,
        tenant: &TenantId,
        contract: &ContractId,
        since: DateTime<Utc>,
    ) -> Result<PastBillingCycles, BillingCycleError> {
        self.past_since_at(tenant, contract, since, Utc::now()).await
    }

    /// Historical cycles from `since` onward, plus the currently failing
    /// cycle if there is one.
    ///
    /// Cycles are returned in the feed's descending date order. A contract
    /// without any cycle yet has an empty history.
    #[instrument(skip(self, tenant, contract), fields(tenant = %tenant, contract = %contract), err)]
    pub async fn past_since_at(
        &self,
        tenant: &TenantId,
        contract: &ContractId,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<PastBillingCycles, BillingCycleError> {
        let scope = (tenant, contract);
        let lookup = self
            .feed
            .cycle_start(tenant, contract, CycleSelector::Index(1))
            .await?
            .ok_or_else(|| data_unavailable("cycle_start", scope))?;
        let first_cycle = match lookup {
            CycleLookup::Found(at) => at,
            CycleLookup::NoSuchCycle => {
                debug!("contract has no billing cycles yet");
                return Ok(PastBillingCycles::default());
            }
        };

        let range = DateRange {
            start: first_cycle.max(since),
            end: now
                .checked_add_signed(self.config.past_lookahead)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let today = start_of_day(now);

        let mut past = Vec::new();
        let mut failure_candidate: Option<BillingCycle> = None;
        self.walk(
            scope,
            "past_since",
            self.config.past_page_size,
            SortOrder::Descending,
            range,
            |cycle| {
                let order = cycle.fulfilled_order().cloned();
                if order.is_none() && cycle.expected_date < now {
                    let later = failure_candidate
                        .as_ref()
                        .is_none_or(|c| cycle.expected_date > c.expected_date);
                    if later {
                        failure_candidate = Some(cycle.clone());
                    }
                }
                if order.is_some() || cycle.expected_date < today {
                    past.push(PastBillingCycle {
                        expected_date: cycle.expected_date,
                        skipped: cycle.skipped,
                        order,
                    });
                }
                true
            },
        )
        .await?;

        let failed_billing_cycle = failure_candidate.and_then(|cycle| {
            let code = cycle.latest_attempt()?.processing_error_code.clone()?;
            Some(FailedBillingCycle {
                expected_date: cycle.expected_date,
                processing_error_code: code,
            })
        });

        Ok(PastBillingCycles {
            past_billing_cycles: past,
            failed_billing_cycle,
        })
    }

    /// Page through the feed until it is exhausted or `visit` returns false.
    async fn walk<V>(
        &self,
        (tenant, contract): (&TenantId, &ContractId),
        label: &'static str,
        page_size: u32,
        sort_order: SortOrder,
        range: DateRange,
        mut visit: V,
    ) -> Result<(), BillingCycleError>
    where
        V: FnMut(&BillingCycle) -> bool + Send,
    {
        let mut query = BillingCycleQuery {
            tenant: tenant.clone(),
            contract_id: contract.clone(),
            cursor: None,
            page_size,
            sort_order,
            range,
        };
        let mut pages = 0usize;

        loop {
            let page = self
                .feed
                .page(&query)
                .await?
                .ok_or_else(|| data_unavailable(label, (tenant, contract)))?;
            pages += 1;
            debug!(
                query = label,
                page = pages,
                edges = page.edges.len(),
                has_next_page = page.page_info.has_next_page,
                "billing cycle page"
            );

            for cycle in &page.edges {
                if !visit(cycle) {
                    return Ok(());
                }
            }

            match page.page_info.end_cursor {
                Some(cursor) if page.page_info.has_next_page => query.cursor = Some(cursor),
                _ => return Ok(()),
            }
        }
    }
}

fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn data_unavailable(
    query: &'static str,
    (tenant, contract): (&TenantId, &ContractId),
) -> BillingCycleError {
    error!(query, tenant = %tenant, contract = %contract, "billing cycle feed returned no data");
    BillingCycleError::DataUnavailable {
        query,
        tenant: tenant.clone(),
        contract: contract.clone(),
    }
}
