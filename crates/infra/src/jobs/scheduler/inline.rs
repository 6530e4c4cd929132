//! Runs each job in the caller's task, during `enqueue`.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{EnqueueOptions, Scheduler, SchedulerCapabilities, SchedulerError};
use crate::jobs::kind::JobKind;
use crate::jobs::runner::JobContext;

/// Executes jobs immediately.
///
/// A schedule time is accepted but not honored: the job runs now. Jobs that
/// reschedule themselves must check [`SchedulerCapabilities::honors_schedule_time`].
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScheduler;

impl InlineScheduler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Scheduler for InlineScheduler {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn capabilities(&self) -> SchedulerCapabilities {
        SchedulerCapabilities {
            honors_schedule_time: false,
            executes_jobs: true,
        }
    }

    async fn enqueue(
        &self,
        job: JobKind,
        options: EnqueueOptions,
        ctx: &JobContext,
    ) -> Result<(), SchedulerError> {
        if let Some(at) = options.schedule_time {
            warn!(
                job = job.name(),
                tenant = %job.tenant(),
                schedule_time = %at,
                "inline scheduler ignores schedule time; running now"
            );
        }
        debug!(job = job.name(), tenant = %job.tenant(), "running job inline");

        job.run(ctx).await.map_err(|source| SchedulerError::Job {
            job: job.name(),
            source,
        })
    }
}
