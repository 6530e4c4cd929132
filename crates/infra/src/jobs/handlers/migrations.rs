//! One-off maintenance sweeps on the `migrations` queue.
//!
//! [`EnqueueTransitionFailedContractsToActiveJob`] fans out one
//! [`TransitionFailedContractsToActiveJob`] per tenant with an active billing
//! schedule; each of those resumes every contract stuck in `FAILED`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cadence_core::TenantId;

use crate::jobs::error::JobError;
use crate::jobs::job::{Job, JobParameters};
use crate::jobs::runner::JobContext;
use crate::jobs::scheduler::EnqueueOptions;

const QUEUE: &str = "migrations";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransitionPayload {}

#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueTransitionFailedContractsToActiveJob {
    parameters: JobParameters<TransitionPayload>,
}

#[async_trait]
impl Job for EnqueueTransitionFailedContractsToActiveJob {
    type Payload = TransitionPayload;

    const NAME: &'static str = "EnqueueTransitionFailedContractsToActiveJob";
    const QUEUE: &'static str = QUEUE;

    fn new(parameters: JobParameters<TransitionPayload>) -> Self {
        Self { parameters }
    }

    fn parameters(&self) -> &JobParameters<TransitionPayload> {
        &self.parameters
    }

    async fn perform(&self, ctx: &JobContext) -> Result<(), JobError> {
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

            for tenant in &batch {
                let job = TransitionFailedContractsToActiveJob::new(JobParameters::new(
                    tenant.clone(),
                    TransitionPayload {},
                ));
                ctx.enqueue(job, EnqueueOptions::default()).await?;
            }
            info!(enqueued = batch.len(), "failed-contract transitions enqueued");

            if batch.len() < batch_size {
                break;
            }
            after = batch.last().cloned();
        }
        Ok(())
    }
}

/// Resumes every `FAILED` contract of one tenant in a single bulk operation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionFailedContractsToActiveJob {
    parameters: JobParameters<TransitionPayload>,
}

#[async_trait]
impl Job for TransitionFailedContractsToActiveJob {
    type Payload = TransitionPayload;

    const NAME: &'static str = "TransitionFailedContractsToActiveJob";
    const QUEUE: &'static str = QUEUE;

    fn new(parameters: JobParameters<TransitionPayload>) -> Self {
        Self { parameters }
    }

    fn parameters(&self) -> &JobParameters<TransitionPayload> {
        &self.parameters
    }

    async fn perform(&self, ctx: &JobContext) -> Result<(), JobError> {
        let tenant = self.tenant();
        let platform = &ctx.services().platform;

        let mut failed = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = platform.failed_contracts(tenant, cursor.as_deref()).await?;
            failed.extend(page.contracts.into_iter().map(|c| c.id));
            match (page.has_next_page, page.end_cursor) {
                (true, Some(next)) => cursor = Some(next),
                (true, None) => {
                    warn!("contracts page has more results but no cursor; stopping");
                    break;
                }
                (false, _) => break,
            }
        }

        if failed.is_empty() {
            info!("no failed contracts found");
            return Ok(());
        }

        let bulk_operation = platform.resume_contracts(tenant, &failed).await?;
        info!(
            contracts = failed.len(),
            bulk_operation = %bulk_operation,
            "failed contracts resumed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::jobs::RemoteError;
    use crate::jobs::handlers::test_support::{harness, harness_with, tenant};
    use crate::jobs::services::JobSettings;
    use crate::platform::{ACTIVE_STATUS, ContractSummary, FAILED_STATUS, PlatformCall};
    use cadence_core::ContractId;

    fn contract(n: u64, status: &str) -> ContractSummary {
        ContractSummary {
            id: ContractId::from_numeric(n),
            status: status.to_string(),
            created_at: Utc::now(),
            customer_id: None,
            origin_order_id: None,
        }
    }

    fn transition() -> TransitionFailedContractsToActiveJob {
        TransitionFailedContractsToActiveJob::new(JobParameters::new(tenant(), TransitionPayload {}))
    }

    #[tokio::test]
    async fn fan_out_enqueues_one_transition_per_tenant() {
        let h = harness_with(JobSettings {
            tenant_batch_size: 2,
            ..JobSettings::default()
        });
        for shop in ["a.myshopify.com", "b.myshopify.com", "c.myshopify.com"] {
            h.fakes.shops.install(TenantId::new(shop).unwrap(), "token");
        }

        EnqueueTransitionFailedContractsToActiveJob::new(JobParameters::new(tenant(), TransitionPayload {}))
            .run(&h.ctx)
            .await
            .unwrap();

        let recorded = h.scheduler.recorded_named("TransitionFailedContractsToActiveJob");
        let tenants: Vec<_> = recorded
            .iter()
            .map(|r| r.job.tenant().as_str().to_string())
            .collect();
        assert_eq!(tenants, vec!["a.myshopify.com", "b.myshopify.com", "c.myshopify.com"]);
        assert!(recorded.iter().all(|r| r.job.queue() == "migrations"));
    }

    #[tokio::test]
    async fn fan_out_without_tenants_enqueues_nothing() {
        let h = harness();

        EnqueueTransitionFailedContractsToActiveJob::new(JobParameters::new(tenant(), TransitionPayload {}))
            .run(&h.ctx)
            .await
            .unwrap();

        assert!(h.scheduler.recorded().is_empty());
    }

    #[tokio::test]
    async fn resumes_failed_contracts_across_pages() {
        let h = harness();
        let contracts = (1..=120u64)
            .map(|n| contract(n, if n <= 75 { FAILED_STATUS } else { ACTIVE_STATUS }))
            .collect();
        h.fakes.platform.set_contracts(tenant(), contracts);

        transition().run(&h.ctx).await.unwrap();

        let resumed = h.fakes.platform.resumed();
        assert_eq!(resumed.len(), 1);
        let (resumed_tenant, ids) = &resumed[0];
        assert_eq!(resumed_tenant, &tenant());
        assert_eq!(ids.len(), 75);
        assert!(ids.contains(&ContractId::from_numeric(1)));
        assert!(ids.contains(&ContractId::from_numeric(75)));
        assert_eq!(
            h.fakes
                .platform
                .calls()
                .iter()
                .filter(|c| **c == PlatformCall::FailedContracts)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn nothing_failed_means_no_resume() {
        let h = harness();
        h.fakes
            .platform
            .set_contracts(tenant(), vec![contract(1, ACTIVE_STATUS)]);

        transition().run(&h.ctx).await.unwrap();

        assert!(h.fakes.platform.resumed().is_empty());
        assert!(!h.fakes.platform.calls().contains(&PlatformCall::ResumeContracts));
    }

    #[tokio::test]
    async fn resume_failure_propagates_for_retry() {
        let h = harness();
        h.fakes
            .platform
            .set_contracts(tenant(), vec![contract(1, FAILED_STATUS)]);
        h.fakes
            .platform
            .fail_next(PlatformCall::ResumeContracts, RemoteError::http(503, "unavailable"));

        assert!(transition().run(&h.ctx).await.is_err());
        transition().run(&h.ctx).await.unwrap();
        assert_eq!(h.fakes.platform.resumed().len(), 1);
    }
}
