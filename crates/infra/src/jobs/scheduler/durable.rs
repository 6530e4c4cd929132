//! Hands jobs to an external at-least-once queue.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{EnqueueOptions, Scheduler, SchedulerCapabilities, SchedulerError};
use crate::jobs::kind::JobKind;
use crate::jobs::runner::JobContext;
use crate::task_queue::{DurableTask, TaskSubmitter};

/// Serializes each job into a [`DurableTask`] and submits it.
///
/// `enqueue` resolves once the transport acknowledges the submission;
/// execution happens later through [`JobRunner::dispatch`](crate::jobs::JobRunner::dispatch).
#[derive(Clone)]
pub struct DurableQueueScheduler {
    submitter: Arc<dyn TaskSubmitter>,
}

impl DurableQueueScheduler {
    pub fn new(submitter: Arc<dyn TaskSubmitter>) -> Self {
        Self { submitter }
    }
}

#[async_trait]
impl Scheduler for DurableQueueScheduler {
    fn name(&self) -> &'static str {
        "durable_queue"
    }

    fn capabilities(&self) -> SchedulerCapabilities {
        SchedulerCapabilities {
            honors_schedule_time: true,
            executes_jobs: true,
        }
    }

    async fn enqueue(
        &self,
        job: JobKind,
        options: EnqueueOptions,
        _ctx: &JobContext,
    ) -> Result<(), SchedulerError> {
        let task = DurableTask::from_job(&job, options)?;
        debug!(
            task_id = %task.id,
            job = %task.job_class_name,
            tenant = %task.tenant,
            queue = %task.queue_name,
            schedule_time = ?task.schedule_time,
            "submitting durable task"
        );
        self.submitter.submit(&task).await?;
        Ok(())
    }
}
