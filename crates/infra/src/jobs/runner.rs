//! The job registry and the single enqueue/dispatch entry point.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use cadence_core::TenantId;

use super::error::JobError;
use super::job::{Job, JobParameters};
use super::kind::JobKind;
use super::scheduler::{EnqueueOptions, Scheduler, SchedulerCapabilities, SchedulerError};
use super::services::JobServices;
use crate::task_queue::DurableTask;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("job name {0} is already registered for a different job type")]
    DuplicateName(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    #[error("job {0} is not registered")]
    Unregistered(&'static str),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown job class: {0}")]
    UnknownJob(String),
    #[error("invalid parameters for {job}: {source}")]
    InvalidParameters {
        job: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("job {job} failed: {source}")]
    Failed {
        job: &'static str,
        #[source]
        source: JobError,
    },
}

/// A task delivered back by the durable queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub job_class_name: String,
    pub tenant: TenantId,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub queue_name: Option<String>,
}

impl From<DurableTask> for DispatchRequest {
    fn from(task: DurableTask) -> Self {
        Self {
            job_class_name: task.job_class_name,
            tenant: task.tenant,
            payload: task.payload,
            queue_name: Some(task.queue_name),
        }
    }
}

type Decoder = fn(TenantId, serde_json::Value) -> Result<JobKind, serde_json::Error>;

#[derive(Clone, Copy)]
struct Registration {
    type_id: TypeId,
    queue: &'static str,
    decode: Decoder,
}

fn decode<J>(tenant: TenantId, payload: serde_json::Value) -> Result<JobKind, serde_json::Error>
where
    J: Job + Into<JobKind>,
{
    let payload = serde_json::from_value::<J::Payload>(payload)?;
    Ok(J::new(JobParameters::new(tenant, payload)).into())
}

/// Collects job registrations before the runner is built.
pub struct JobRunnerBuilder {
    scheduler: Arc<dyn Scheduler>,
    services: JobServices,
    registry: HashMap<&'static str, Registration>,
}

impl JobRunnerBuilder {
    /// Register `J` under [`Job::NAME`].
    ///
    /// Registering the same type twice is a no-op; a different type with the
    /// same name is rejected.
    pub fn register<J>(&mut self) -> Result<&mut Self, RegistryError>
    where
        J: Job + Into<JobKind>,
    {
        self.insert(
            J::NAME,
            Registration {
                type_id: TypeId::of::<J>(),
                queue: J::QUEUE,
                decode: decode::<J>,
            },
        )?;
        Ok(self)
    }

    /// Register every [`JobKind`].
    pub fn register_all(&mut self) -> Result<&mut Self, RegistryError> {
        JobKind::register_all(self)?;
        Ok(self)
    }

    fn insert(
        &mut self,
        name: &'static str,
        registration: Registration,
    ) -> Result<(), RegistryError> {
        match self.registry.get(name) {
            Some(existing) if existing.type_id == registration.type_id => Ok(()),
            Some(_) => Err(RegistryError::DuplicateName(name)),
            None => {
                self.registry.insert(name, registration);
                Ok(())
            }
        }
    }

    pub fn build(self) -> JobRunner {
        info!(
            scheduler = self.scheduler.name(),
            jobs = self.registry.len(),
            "job runner ready"
        );
        JobRunner {
            inner: Arc::new(Inner {
                scheduler: self.scheduler,
                services: self.services,
                registry: self.registry,
            }),
        }
    }
}

struct Inner {
    scheduler: Arc<dyn Scheduler>,
    services: JobServices,
    registry: HashMap<&'static str, Registration>,
}

/// Couples the active scheduler with the registry of known jobs.
///
/// Cheap to clone; the registry is read-only once built.
#[derive(Clone)]
pub struct JobRunner {
    inner: Arc<Inner>,
}

impl JobRunner {
    pub fn builder(scheduler: Arc<dyn Scheduler>, services: JobServices) -> JobRunnerBuilder {
        JobRunnerBuilder {
            scheduler,
            services,
            registry: HashMap::new(),
        }
    }

    pub fn services(&self) -> &JobServices {
        &self.inner.services
    }

    pub fn capabilities(&self) -> SchedulerCapabilities {
        self.inner.scheduler.capabilities()
    }

    pub fn scheduler_name(&self) -> &'static str {
        self.inner.scheduler.name()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.registry.contains_key(name)
    }

    /// Context handed to jobs run through this runner.
    pub fn context(&self) -> JobContext {
        JobContext {
            runner: self.clone(),
        }
    }

    /// Hand `job` to the active scheduler.
    ///
    /// Fails without touching the scheduler when the job was never
    /// registered. Submission failures (and, inline, job failures that are
    /// not swallowed) are returned to the caller.
    pub async fn enqueue(
        &self,
        job: impl Into<JobKind>,
        options: EnqueueOptions,
    ) -> Result<(), EnqueueError> {
        let job = job.into();
        if !self.is_registered(job.name()) {
            error!(job = job.name(), tenant = %job.tenant(), "enqueue of unregistered job");
            return Err(EnqueueError::Unregistered(job.name()));
        }

        debug!(
            job = job.name(),
            tenant = %job.tenant(),
            scheduler = self.scheduler_name(),
            "enqueue"
        );
        self.inner
            .scheduler
            .enqueue(job, options, &self.context())
            .await?;
        Ok(())
    }

    /// Fire-and-forget enqueue on the current runtime.
    ///
    /// Failures are only visible in the logs.
    pub fn enqueue_detached(&self, job: impl Into<JobKind>, options: EnqueueOptions) {
        let job = job.into();
        let runner = self.clone();
        tokio::spawn(async move {
            let name = job.name();
            let tenant = job.tenant().clone();
            if let Err(err) = runner.enqueue(job, options).await {
                error!(job = name, tenant = %tenant, error = %err, "detached enqueue failed");
            }
        });
    }

    /// Rebuild a job from its wire form and run it.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<(), DispatchError> {
        let (name, registration) = self
            .inner
            .registry
            .get_key_value(request.job_class_name.as_str())
            .map(|(name, registration)| (*name, *registration))
            .ok_or_else(|| DispatchError::UnknownJob(request.job_class_name.clone()))?;

        if let Some(queue) = request.queue_name.as_deref() {
            if queue != registration.queue {
                warn!(
                    job = name,
                    expected = registration.queue,
                    received = queue,
                    "dispatched job arrived on an unexpected queue"
                );
            }
        }

        let job = (registration.decode)(request.tenant, request.payload)
            .map_err(|source| DispatchError::InvalidParameters { job: name, source })?;

        job.run(&self.context())
            .await
            .map_err(|source| DispatchError::Failed { job: name, source })
    }
}

/// What a running job can reach: its collaborators and the runner, for
/// enqueuing follow-up work.
#[derive(Clone)]
pub struct JobContext {
    runner: JobRunner,
}

impl JobContext {
    pub fn services(&self) -> &JobServices {
        self.runner.services()
    }

    pub fn runner(&self) -> &JobRunner {
        &self.runner
    }

    pub fn capabilities(&self) -> SchedulerCapabilities {
        self.runner.capabilities()
    }

    pub async fn enqueue(
        &self,
        job: impl Into<JobKind>,
        options: EnqueueOptions,
    ) -> Result<(), EnqueueError> {
        self.runner.enqueue(job, options).await
    }
}
