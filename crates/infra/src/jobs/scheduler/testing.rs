//! Deterministic scheduler double.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::{EnqueueOptions, Scheduler, SchedulerCapabilities, SchedulerError};
use crate::jobs::kind::JobKind;
use crate::jobs::runner::JobContext;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEnqueue {
    pub job: JobKind,
    pub options: EnqueueOptions,
}

/// Appends every enqueue to an in-memory log and returns. Never runs a job.
#[derive(Debug, Default)]
pub struct TestScheduler {
    log: Mutex<Vec<RecordedEnqueue>>,
}

impl TestScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<RecordedEnqueue> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Recorded jobs with the given registry name, in enqueue order.
    pub fn recorded_named(&self, name: &str) -> Vec<RecordedEnqueue> {
        self.recorded()
            .into_iter()
            .filter(|r| r.job.name() == name)
            .collect()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[async_trait]
impl Scheduler for TestScheduler {
    fn name(&self) -> &'static str {
        "test"
    }

    fn capabilities(&self) -> SchedulerCapabilities {
        SchedulerCapabilities {
            honors_schedule_time: true,
            executes_jobs: false,
        }
    }

    async fn enqueue(
        &self,
        job: JobKind,
        options: EnqueueOptions,
        _ctx: &JobContext,
    ) -> Result<(), SchedulerError> {
        debug!(job = job.name(), tenant = %job.tenant(), "recording enqueue");
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEnqueue { job, options });
        Ok(())
    }
}
