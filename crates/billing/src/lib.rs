//! `cadence-billing`: a contract's billing calendar, reconstructed from the
//! commerce platform's paginated billing-cycle feed.
//!
//! - [`model`]: billing cycles, attempts and feed pages
//! - [`feed`]: the [`BillingCycleFeed`] seam and an in-memory implementation
//! - [`window`]: [`BillingCycleWindowResolver`], producing the upcoming, past and
//!   currently-failed views of a contract

pub mod feed;
pub mod model;
pub mod window;

pub use feed::{BillingCycleFeed, FeedError, InMemoryBillingCycleFeed};
pub use model::{
    BillingAttempt, BillingCycle, BillingCyclePage, BillingCycleQuery, BillingInterval,
    CycleLookup, CycleSelector, DateRange, OrderRef, PageInfo, SortOrder,
};
pub use window::{
    BillingCycleError, BillingCycleWindowResolver, FailedBillingCycle, PastBillingCycle,
    PastBillingCycles, ResolverConfig, UpcomingBillingCycle,
};
