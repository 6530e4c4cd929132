use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::jobs::error::JobError;
use crate::jobs::job::{Job, JobParameters};
use crate::jobs::runner::JobContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisableShopPayload {}

/// Tears down a tenant's installation once the app is no longer installed.
#[derive(Debug, Clone, PartialEq)]
pub struct DisableShopJob {
    parameters: JobParameters<DisableShopPayload>,
}

#[async_trait]
impl Job for DisableShopJob {
    type Payload = DisableShopPayload;

    const NAME: &'static str = "DisableShopJob";
    const QUEUE: &'static str = "webhooks";

    fn new(parameters: JobParameters<DisableShopPayload>) -> Self {
        Self { parameters }
    }

    fn parameters(&self) -> &JobParameters<DisableShopPayload> {
        &self.parameters
    }

    async fn perform(&self, ctx: &JobContext) -> Result<(), JobError> {
        let tenant = self.tenant();
        let services = ctx.services();

        let empty_access_token = services.shops.has_empty_access_token(tenant).await?;
        info!(empty_access_token, "checked for empty access token");

        if !empty_access_token {
            match services.platform.probe_shop(tenant).await {
                Ok(()) => {
                    info!("app is installed; keeping shop");
                    return Ok(());
                }
                Err(err) if err.status() == Some(401) => {
                    warn!(error = %err, "shop probe unauthorized; treating as uninstalled");
                }
                Err(err) => return Err(err.into()),
            }
        }

        services.shops.disable(tenant).await?;
        info!("shop disabled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::RemoteError;
    use crate::jobs::handlers::test_support::{Harness, harness, tenant};
    use crate::platform::PlatformCall;
    use crate::shop_store::ShopRecord;

    fn job() -> DisableShopJob {
        DisableShopJob::new(JobParameters::new(tenant(), DisableShopPayload {}))
    }

    fn installed(token: &str) -> Harness {
        let h = harness();
        h.fakes.shops.install(tenant(), token);
        h
    }

    fn disabled() -> Option<ShopRecord> {
        Some(ShopRecord {
            sessions: Vec::new(),
            billing_schedule_active: false,
        })
    }

    #[tokio::test]
    async fn reachable_shop_is_kept() {
        let h = installed("shpat_123");
        job().run(&h.ctx).await.unwrap();

        assert!(h.fakes.shops.record(&tenant()).unwrap().billing_schedule_active);
        assert_eq!(h.fakes.platform.calls(), vec![PlatformCall::ProbeShop]);
    }

    #[tokio::test]
    async fn empty_token_disables_without_probing() {
        let h = installed("");
        job().run(&h.ctx).await.unwrap();

        assert_eq!(h.fakes.shops.record(&tenant()), disabled());
        assert!(h.fakes.platform.calls().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_probe_disables() {
        let h = installed("shpat_123");
        h.fakes
            .platform
            .fail_next(PlatformCall::ProbeShop, RemoteError::http(401, "unauthorized"));

        job().run(&h.ctx).await.unwrap();
        assert_eq!(h.fakes.shops.record(&tenant()), disabled());
    }

    #[tokio::test]
    async fn other_probe_failures_propagate() {
        let h = installed("shpat_123");
        h.fakes
            .platform
            .fail_next(PlatformCall::ProbeShop, RemoteError::http(503, "unavailable"));

        assert!(job().run(&h.ctx).await.is_err());
        assert!(h.fakes.shops.record(&tenant()).unwrap().billing_schedule_active);
    }

    #[test]
    fn payload_is_an_empty_object() {
        assert_eq!(
            serde_json::to_value(DisableShopPayload {}).unwrap(),
            serde_json::json!({})
        );
    }
}
