//! The unit-of-work contract every job kind implements.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span};

use cadence_core::TenantId;

use super::error::{JobError, classify};
use super::runner::JobContext;

/// Immutable parameters of one job: the tenant it acts for and its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobParameters<P> {
    pub tenant: TenantId,
    pub payload: P,
}

impl<P> JobParameters<P> {
    pub fn new(tenant: TenantId, payload: P) -> Self {
        Self { tenant, payload }
    }
}

/// One unit of work bound to a tenant.
///
/// Schedulers only ever call [`Job::run`]; `perform` holds the job's body.
#[async_trait]
pub trait Job: Debug + Send + Sync + Sized + 'static {
    type Payload: Serialize + DeserializeOwned + Debug + Clone + PartialEq + Send + Sync;

    /// Registry name; also the class name carried by durable tasks.
    const NAME: &'static str;
    const QUEUE: &'static str = "default";

    fn new(parameters: JobParameters<Self::Payload>) -> Self;

    fn parameters(&self) -> &JobParameters<Self::Payload>;

    fn tenant(&self) -> &TenantId {
        &self.parameters().tenant
    }

    async fn perform(&self, ctx: &JobContext) -> Result<(), JobError>;

    /// Run `perform` and apply the retry policy to its failure.
    ///
    /// Permanent failures are logged and resolve; everything else is logged
    /// and returned unchanged so the caller (or the queue) can retry.
    async fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        run_job(self, ctx).await
    }
}

async fn run_job<J: Job>(job: &J, ctx: &JobContext) -> Result<(), JobError> {
    let parameters = job.parameters();
    let span = info_span!(
        "job",
        job = J::NAME,
        tenant = %parameters.tenant,
        queue = J::QUEUE,
    );

    async move {
        info!(payload = ?parameters.payload, "job started");

        match job.perform(ctx).await {
            Ok(()) => {
                info!("job completed");
                Ok(())
            }
            Err(err) => {
                let kind = classify(&err);
                let swallowed = kind.is_swallowed();
                error!(
                    classification = kind.as_str(),
                    swallowed,
                    error = %err,
                    "job failed"
                );
                if swallowed { Ok(()) } else { Err(err) }
            }
        }
    }
    .instrument(span)
    .await
}
