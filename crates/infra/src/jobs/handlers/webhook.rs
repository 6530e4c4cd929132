use async_trait::async_trait;

use crate::jobs::error::JobError;
use crate::jobs::job::{Job, JobParameters};
use crate::jobs::runner::JobContext;
use crate::notify::ForwardedEvent;

/// Forwards a contract lifecycle event to the external system.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalWebhookJob {
    parameters: JobParameters<ForwardedEvent>,
}

#[async_trait]
impl Job for ExternalWebhookJob {
    type Payload = ForwardedEvent;

    const NAME: &'static str = "ExternalWebhookJob";
    const QUEUE: &'static str = "webhooks";

    fn new(parameters: JobParameters<ForwardedEvent>) -> Self {
        Self { parameters }
    }

    fn parameters(&self) -> &JobParameters<ForwardedEvent> {
        &self.parameters
    }

    async fn perform(&self, ctx: &JobContext) -> Result<(), JobError> {
        ctx.services()
            .forwarder
            .forward(self.tenant(), &self.parameters.payload)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::RemoteError;
    use crate::jobs::handlers::test_support::{harness, tenant};

    fn job() -> ExternalWebhookJob {
        ExternalWebhookJob::new(JobParameters::new(
            tenant(),
            ForwardedEvent::new("subscription-paused", serde_json::json!({"id": 1})),
        ))
    }

    #[tokio::test]
    async fn forwards_the_event() {
        let h = harness();
        job().run(&h.ctx).await.unwrap();

        let forwarded = h.fakes.forwarder.forwarded();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].0, tenant());
        assert_eq!(forwarded[0].1.event, "subscription-paused");
    }

    #[tokio::test]
    async fn transport_failure_propagates_unchanged() {
        let h = harness();
        h.fakes
            .forwarder
            .fail_next(RemoteError::Transport("connection reset".into()));

        let err = job().run(&h.ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "remote transport error: connection reset");
    }

    #[test]
    fn payload_wire_shape() {
        let event: ForwardedEvent = serde_json::from_value(serde_json::json!({
            "event": "subscription-created",
            "subscriptionData": {"id": 5},
            "orderNote": "gift"
        }))
        .unwrap();
        assert_eq!(event.order_note.as_deref(), Some("gift"));
        assert_eq!(event.checkout_id, None);
    }
}
