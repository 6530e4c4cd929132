//! Merchant inventory-failure digests.
//!
//! [`EnqueueInventoryFailureEmailJob`] fans out one
//! [`SendInventoryFailureEmailJob`] per active tenant; each of those only
//! sends when the merchant's configured frequency matches its own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use cadence_core::TenantId;

use crate::jobs::error::JobError;
use crate::jobs::job::{Job, JobParameters};
use crate::jobs::runner::JobContext;
use crate::jobs::scheduler::EnqueueOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationFrequency {
    Immediately,
    Daily,
    Weekly,
    Monthly,
}

impl NotificationFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationFrequency::Immediately => "immediately",
            NotificationFrequency::Daily => "daily",
            NotificationFrequency::Weekly => "weekly",
            NotificationFrequency::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [
            NotificationFrequency::Immediately,
            NotificationFrequency::Daily,
            NotificationFrequency::Weekly,
            NotificationFrequency::Monthly,
        ]
        .into_iter()
        .find(|f| f.as_str() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyPayload {
    pub frequency: NotificationFrequency,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueInventoryFailureEmailJob {
    parameters: JobParameters<FrequencyPayload>,
}

#[async_trait]
impl Job for EnqueueInventoryFailureEmailJob {
    type Payload = FrequencyPayload;

    const NAME: &'static str = "EnqueueInventoryFailureEmailJob";

    fn new(parameters: JobParameters<FrequencyPayload>) -> Self {
        Self { parameters }
    }

    fn parameters(&self) -> &JobParameters<FrequencyPayload> {
        &self.parameters
    }

    async fn perform(&self, ctx: &JobContext) -> Result<(), JobError> {
        let payload = self.parameters.payload;
        let services = ctx.services();
        let batch_size = services.settings.tenant_batch_size.max(1);

        let mut after: Option<TenantId> = None;
        loop {
            let batch = services
                .shops
                .active_tenants(after.as_ref(), batch_size)
                .await?;
            if batch.is_empty() {
                break;
            }

            let mut enqueued = 0usize;
            for tenant in &batch {
                let job = SendInventoryFailureEmailJob::new(JobParameters::new(tenant.clone(), payload));
                match ctx.enqueue(job, EnqueueOptions::default()).await {
                    Ok(()) => enqueued += 1,
                    Err(err) => error!(tenant = %tenant, error = %err, "failed to enqueue inventory email"),
                }
            }
            info!(enqueued, batch = batch.len(), "inventory email batch enqueued");

            if batch.len() < batch_size {
                break;
            }
            after = batch.last().cloned();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendInventoryFailureEmailJob {
    parameters: JobParameters<FrequencyPayload>,
}

#[async_trait]
impl Job for SendInventoryFailureEmailJob {
    type Payload = FrequencyPayload;

    const NAME: &'static str = "SendInventoryFailureEmailJob";

    fn new(parameters: JobParameters<FrequencyPayload>) -> Self {
        Self { parameters }
    }

    fn parameters(&self) -> &JobParameters<FrequencyPayload> {
        &self.parameters
    }

    async fn perform(&self, ctx: &JobContext) -> Result<(), JobError> {
        let tenant = self.tenant();
        let frequency = self.parameters.payload.frequency;
        let services = ctx.services();

        let Some(settings) = services.platform.merchant_settings(tenant).await? else {
            error!(frequency = frequency.as_str(), "merchant settings not found");
            return Ok(());
        };

        let configured = NotificationFrequency::parse(&settings.inventory_notification_frequency);
        if configured != Some(frequency) {
            info!(
                frequency = frequency.as_str(),
                configured = %settings.inventory_notification_frequency,
                "frequency does not match shop setting; skipping"
            );
            return Ok(());
        }

        services.notifier.send_inventory_failure_email(tenant).await?;
        info!(frequency = frequency.as_str(), "inventory failure email sent");
        Ok(())
    }
}
