//! Scheduling backends.
//!
//! Exactly one backend is active per process:
//! - [`InlineScheduler`]: runs the job during `enqueue`
//! - [`DurableQueueScheduler`]: hands a [`DurableTask`](crate::task_queue::DurableTask)
//!   to an at-least-once queue
//! - [`TestScheduler`]: records enqueues, never runs them

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::task_queue::TaskSubmitError;

use super::error::JobError;
use super::kind::JobKind;
use super::runner::JobContext;

pub mod durable;
pub mod inline;
pub mod testing;

pub use durable::DurableQueueScheduler;
pub use inline::InlineScheduler;
pub use testing::{RecordedEnqueue, TestScheduler};

/// Per-enqueue options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueOptions {
    /// Absolute instant before which the job should not run (epoch seconds on the wire).
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub schedule_time: Option<DateTime<Utc>>,
}

impl EnqueueOptions {
    pub fn at(schedule_time: DateTime<Utc>) -> Self {
        Self {
            schedule_time: Some(schedule_time),
        }
    }

    pub fn after(delay: Duration) -> Self {
        Self::at(Utc::now() + delay)
    }
}

/// What a backend actually does with an enqueued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerCapabilities {
    pub honors_schedule_time: bool,
    pub executes_jobs: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("task submission failed: {0}")]
    Submit(#[from] TaskSubmitError),
    #[error("failed to serialize job parameters: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("job {job} failed during inline execution: {source}")]
    Job {
        job: &'static str,
        #[source]
        source: JobError,
    },
}

#[async_trait]
pub trait Scheduler: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> SchedulerCapabilities;

    async fn enqueue(
        &self,
        job: JobKind,
        options: EnqueueOptions,
        ctx: &JobContext,
    ) -> Result<(), SchedulerError>;
}
