use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use cadence_core::OrderId;

use crate::jobs::error::JobError;
use crate::jobs::job::{Job, JobParameters};
use crate::jobs::runner::JobContext;

pub const FIRST_ORDER_TAGS: &[&str] = &["Subscription", "Subscription First Order"];
pub const RECURRING_ORDER_TAGS: &[&str] = &["Subscription", "Subscription Recurring Order"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagOrderPayload {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub tags: Vec<String>,
}

impl TagOrderPayload {
    pub fn new(order_id: Option<OrderId>, tags: &[&str]) -> Self {
        Self {
            order_id,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

/// Tags the order a subscription produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TagSubscriptionOrderJob {
    parameters: JobParameters<TagOrderPayload>,
}

#[async_trait]
impl Job for TagSubscriptionOrderJob {
    type Payload = TagOrderPayload;

    const NAME: &'static str = "TagSubscriptionOrderJob";
    const QUEUE: &'static str = "webhooks";

    fn new(parameters: JobParameters<TagOrderPayload>) -> Self {
        Self { parameters }
    }

    fn parameters(&self) -> &JobParameters<TagOrderPayload> {
        &self.parameters
    }

    async fn perform(&self, ctx: &JobContext) -> Result<(), JobError> {
        let payload = &self.parameters.payload;
        let Some(order) = &payload.order_id else {
            info!("no order id in payload; nothing to tag");
            return Ok(());
        };

        ctx.services()
            .platform
            .add_order_tags(self.tenant(), order, &payload.tags)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::RemoteError;
    use crate::jobs::handlers::test_support::{harness, tenant};
    use crate::platform::{PlatformCall, TaggedOrder};

    fn job(order_id: Option<OrderId>) -> TagSubscriptionOrderJob {
        TagSubscriptionOrderJob::new(JobParameters::new(
            tenant(),
            TagOrderPayload::new(order_id, FIRST_ORDER_TAGS),
        ))
    }

    #[tokio::test]
    async fn tags_the_order() {
        let h = harness();
        job(Some(OrderId::from_numeric(42))).run(&h.ctx).await.unwrap();

        assert_eq!(
            h.fakes.platform.tagged_orders(),
            vec![TaggedOrder {
                tenant: tenant(),
                order: OrderId::from_numeric(42),
                tags: vec!["Subscription".into(), "Subscription First Order".into()],
            }]
        );
    }

    #[tokio::test]
    async fn missing_order_is_a_no_op() {
        let h = harness();
        job(None).run(&h.ctx).await.unwrap();
        assert!(h.fakes.platform.calls().is_empty());
    }

    #[tokio::test]
    async fn locked_shop_is_swallowed() {
        let h = harness();
        h.fakes
            .platform
            .fail_next(PlatformCall::AddOrderTags, RemoteError::http(423, "locked"));

        job(Some(OrderId::from_numeric(1))).run(&h.ctx).await.unwrap();
        assert!(h.fakes.platform.tagged_orders().is_empty());
    }

    #[test]
    fn payload_wire_shape() {
        let payload: TagOrderPayload =
            serde_json::from_value(serde_json::json!({"tags": ["a"]})).unwrap();
        assert_eq!(payload.order_id, None);
        assert_eq!(payload.tags, vec!["a".to_string()]);
    }
}
