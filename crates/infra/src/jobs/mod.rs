//! Tenant-scoped background jobs.
//!
//! ## Design
//!
//! - Every job carries a tenant and a typed payload
//! - Exactly one [`Scheduler`] is active per process; callers only see [`JobRunner::enqueue`]
//! - Failures are classified once, in [`Job::run`]: permanent remote failures and
//!   disconnected tenants resolve, everything else propagates for the queue to retry
//!
//! ## Components
//!
//! - `Job`: the unit of work and its `perform` body
//! - `JobKind`: the closed set of registered kinds
//! - `Scheduler`: inline, durable queue, or test backend
//! - `JobRunner`: registry, enqueue, and dispatch of delivered tasks

pub mod error;
pub mod handlers;
pub mod job;
pub mod kind;
pub mod runner;
pub mod scheduler;
pub mod services;

pub use error::{FailureKind, JobError, RemoteError, classify};
pub use handlers::{
    CustomerEmailPayload, CustomerSendEmailJob, DisableShopJob, DisableShopPayload,
    EnqueueInventoryFailureEmailJob, EnqueueTransitionFailedContractsToActiveJob,
    ExternalWebhookJob, FIRST_ORDER_TAGS, FrequencyPayload, MerchantEmailPayload,
    MerchantSendEmailJob, MonitorPayload, NotificationFrequency, RECURRING_ORDER_TAGS,
    SendInventoryFailureEmailJob, SubscriptionMonitorJob, TagOrderPayload,
    TagSubscriptionOrderJob, TransitionFailedContractsToActiveJob, TransitionPayload,
};
pub use job::{Job, JobParameters};
pub use kind::JobKind;
pub use runner::{
    DispatchError, DispatchRequest, EnqueueError, JobContext, JobRunner, JobRunnerBuilder,
    RegistryError,
};
pub use scheduler::{
    DurableQueueScheduler, EnqueueOptions, InlineScheduler, RecordedEnqueue, Scheduler,
    SchedulerCapabilities, SchedulerError, TestScheduler,
};
pub use services::{InMemoryServices, JobServices, JobSettings};
