//! The closed set of job kinds this service knows how to run.

use cadence_core::TenantId;

use super::error::JobError;
use super::handlers::{
    CustomerSendEmailJob, DisableShopJob, EnqueueInventoryFailureEmailJob,
    EnqueueTransitionFailedContractsToActiveJob, ExternalWebhookJob, MerchantSendEmailJob,
    SendInventoryFailureEmailJob, SubscriptionMonitorJob, TagSubscriptionOrderJob,
    TransitionFailedContractsToActiveJob,
};
use super::job::Job;
use super::runner::{JobContext, JobRunnerBuilder, RegistryError};

macro_rules! job_kinds {
    ($($variant:ident($job:ty)),+ $(,)?) => {
        /// One constructed job of any registered kind.
        #[derive(Debug, Clone, PartialEq)]
        pub enum JobKind {
            $($variant($job),)+
        }

        impl JobKind {
            /// Registry names of every kind.
            pub const NAMES: &'static [&'static str] = &[$(<$job as Job>::NAME),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $(JobKind::$variant(_) => <$job as Job>::NAME,)+
                }
            }

            pub fn queue(&self) -> &'static str {
                match self {
                    $(JobKind::$variant(_) => <$job as Job>::QUEUE,)+
                }
            }

            pub fn tenant(&self) -> &TenantId {
                match self {
                    $(JobKind::$variant(job) => job.tenant(),)+
                }
            }

            /// The payload in its wire form.
            pub fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
                match self {
                    $(JobKind::$variant(job) => serde_json::to_value(&job.parameters().payload),)+
                }
            }

            pub async fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
                match self {
                    $(JobKind::$variant(job) => job.run(ctx).await,)+
                }
            }

            pub(super) fn register_all(builder: &mut JobRunnerBuilder) -> Result<(), RegistryError> {
                $(builder.register::<$job>()?;)+
                Ok(())
            }
        }

        $(
            impl From<$job> for JobKind {
                fn from(job: $job) -> Self {
                    JobKind::$variant(job)
                }
            }
        )+
    };
}

job_kinds! {
    TagSubscriptionOrder(TagSubscriptionOrderJob),
    CustomerSendEmail(CustomerSendEmailJob),
    MerchantSendEmail(MerchantSendEmailJob),
    ExternalWebhook(ExternalWebhookJob),
    DisableShop(DisableShopJob),
    SubscriptionMonitor(SubscriptionMonitorJob),
    EnqueueInventoryFailureEmail(EnqueueInventoryFailureEmailJob),
    SendInventoryFailureEmail(SendInventoryFailureEmailJob),
    EnqueueTransitionFailedContractsToActive(EnqueueTransitionFailedContractsToActiveJob),
    TransitionFailedContractsToActive(TransitionFailedContractsToActiveJob),
}
