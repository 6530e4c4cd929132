//! Billing-cycle records as returned by the commerce platform.

use chrono::{DateTime, Days, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use cadence_core::{ContractId, OrderId, TenantId};

/// Order produced by a successful billing attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRef {
    pub id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One concrete charge attempt for a cycle.
///
/// An attempt either fulfilled (references an order), failed (carries a
/// processing-error code), or is still in flight (neither).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingAttempt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_error_code: Option<String>,
}

impl BillingAttempt {
    pub fn fulfilled(order: OrderId) -> Self {
        Self {
            order: Some(OrderRef {
                id: order,
                created_at: None,
            }),
            processing_error_code: None,
        }
    }

    pub fn failed(code: impl Into<String>) -> Self {
        Self {
            order: None,
            processing_error_code: Some(code.into()),
        }
    }
}

/// One scheduled occurrence of a contract's calendar.
///
/// `attempts` are ordered most recent first, as the feed returns them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingCycle {
    pub expected_date: DateTime<Utc>,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub attempts: Vec<BillingAttempt>,
}

impl BillingCycle {
    pub fn new(expected_date: DateTime<Utc>) -> Self {
        Self {
            expected_date,
            skipped: false,
            attempts: Vec::new(),
        }
    }

    pub fn skipped(mut self) -> Self {
        self.skipped = true;
        self
    }

    pub fn with_attempt(mut self, attempt: BillingAttempt) -> Self {
        self.attempts.push(attempt);
        self
    }

    /// The order of any attempt on this cycle, if one fulfilled it.
    pub fn fulfilled_order(&self) -> Option<&OrderRef> {
        self.attempts.iter().find_map(|a| a.order.as_ref())
    }

    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled_order().is_some()
    }

    pub fn latest_attempt(&self) -> Option<&BillingAttempt> {
        self.attempts.first()
    }
}

/// Cursor pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_cursor: Option<String>,
}

/// One page of the billing-cycle feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingCyclePage {
    pub edges: Vec<BillingCycle>,
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Inclusive expected-date window for a feed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Arguments of one feed page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingCycleQuery {
    /// Shop whose admin API answers the query.
    pub tenant: TenantId,
    pub contract_id: ContractId,
    pub cursor: Option<String>,
    pub page_size: u32,
    pub sort_order: SortOrder,
    pub range: DateRange,
}

/// Selects a single cycle for the index lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleSelector {
    /// 1-based cycle index in the contract's calendar.
    Index(u32),
    /// The cycle whose window contains this instant.
    Date(DateTime<Utc>),
}

/// Answer to an index lookup that came back with a data envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleLookup {
    Found(DateTime<Utc>),
    /// The contract exists but has no cycle at that position yet.
    NoSuchCycle,
}

impl CycleLookup {
    pub fn date(self) -> Option<DateTime<Utc>> {
        match self {
            CycleLookup::Found(at) => Some(at),
            CycleLookup::NoSuchCycle => None,
        }
    }
}

/// Selling-plan billing interval unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingInterval {
    Day,
    Week,
    Month,
    Year,
}

impl BillingInterval {
    /// `from` advanced by `count` intervals, saturating at the calendar bounds.
    pub fn advance(self, from: DateTime<Utc>, count: u32) -> DateTime<Utc> {
        let advanced = match self {
            BillingInterval::Day => from.checked_add_days(Days::new(u64::from(count))),
            BillingInterval::Week => {
                Duration::try_weeks(i64::from(count)).and_then(|d| from.checked_add_signed(d))
            }
            BillingInterval::Month => from.checked_add_months(Months::new(count)),
            BillingInterval::Year => count
                .checked_mul(12)
                .and_then(|m| from.checked_add_months(Months::new(m))),
        };
        advanced.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl core::str::FromStr for BillingInterval {
    type Err = cadence_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DAY" => Ok(Self::Day),
            "WEEK" => Ok(Self::Week),
            "MONTH" => Ok(Self::Month),
            "YEAR" => Ok(Self::Year),
            other => Err(cadence_core::DomainError::validation(format!(
                "unknown billing interval: {other}"
            ))),
        }
    }
}
