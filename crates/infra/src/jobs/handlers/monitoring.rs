//! Periodic poll for newly created contracts.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::jobs::error::JobError;
use crate::jobs::job::{Job, JobParameters};
use crate::jobs::runner::JobContext;
use crate::jobs::scheduler::EnqueueOptions;
use crate::notify::ForwardedEvent;
use crate::platform::ContractSummary;

use super::webhook::ExternalWebhookJob;

/// Look-back when no previous run is known.
fn default_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Forwards `subscription-created` for contracts created since the last run,
/// then schedules the next run.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionMonitorJob {
    parameters: JobParameters<MonitorPayload>,
}

fn created_event(contract: &ContractSummary) -> ForwardedEvent {
    ForwardedEvent::new(
        "subscription-created",
        json!({
            "subscriptionContractId": contract.id,
            "customerId": contract.customer_id,
            "orderId": contract.origin_order_id,
            "status": contract.status,
            "source": "monitoring",
        }),
    )
}

#[async_trait]
impl Job for SubscriptionMonitorJob {
    type Payload = MonitorPayload;

    const NAME: &'static str = "SubscriptionMonitorJob";
    const QUEUE: &'static str = "monitoring";

    fn new(parameters: JobParameters<MonitorPayload>) -> Self {
        Self { parameters }
    }

    fn parameters(&self) -> &JobParameters<MonitorPayload> {
        &self.parameters
    }

    async fn perform(&self, ctx: &JobContext) -> Result<(), JobError> {
        let tenant = self.tenant();
        let payload = &self.parameters.payload;
        let services = ctx.services();
        let started_at = Utc::now();

        let Some(page) = services
            .platform
            .recent_contracts(tenant, payload.cursor.as_deref())
            .await?
        else {
            error!("contracts query returned no data");
            return Ok(());
        };

        let cutoff = payload
            .last_checked
            .unwrap_or_else(|| default_cutoff(started_at));
        let created: Vec<_> = page
            .contracts
            .iter()
            .filter(|contract| contract.created_at > cutoff)
            .collect();
        info!(count = created.len(), cutoff = %cutoff, "new contracts found");

        for contract in created {
            ctx.enqueue(
                ExternalWebhookJob::new(JobParameters::new(tenant.clone(), created_event(contract))),
                EnqueueOptions::default(),
            )
            .await?;
        }

        if !ctx.capabilities().honors_schedule_time {
            warn!("scheduler does not honor schedule times; not rescheduling monitor");
            return Ok(());
        }

        let next = MonitorPayload {
            last_checked: Some(started_at),
            cursor: page.has_next_page.then_some(page.end_cursor).flatten(),
        };
        let options = EnqueueOptions::after(services.settings.monitor_interval);
        ctx.enqueue(
            SubscriptionMonitorJob::new(JobParameters::new(tenant.clone(), next)),
            options,
        )
        .await?;
        info!(next_run = ?options.schedule_time, "scheduled next monitoring run");
        Ok(())
    }
}
