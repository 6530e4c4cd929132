//! Redis Streams-backed task submitter (durable, at-least-once).
//!
//! ## Layout
//!
//! - **Ready tasks**: `XADD <prefix>:<queue>` (one stream per queue name)
//! - **Delayed tasks**: `ZADD <prefix>:delayed`, scored by schedule time in
//!   epoch seconds; a promoter outside this crate moves due entries onto their
//!   stream.
//!
//! Consumption and delivery to the dispatch endpoint are the transport's
//! concern; this type only writes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;

use super::{DurableTask, TaskSubmitError, TaskSubmitter};

/// Default key prefix for task streams.
pub const DEFAULT_STREAM_PREFIX: &str = "cadence:tasks";

#[derive(Debug, Clone)]
pub struct RedisStreamsTaskSubmitter {
    client: Arc<redis::Client>,
    prefix: String,
}

impl RedisStreamsTaskSubmitter {
    /// Create a submitter for `redis_url` (e.g. "redis://localhost:6379").
    pub fn new(
        redis_url: impl AsRef<str>,
        prefix: Option<String>,
    ) -> Result<Self, TaskSubmitError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| TaskSubmitError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            prefix: prefix.unwrap_or_else(|| DEFAULT_STREAM_PREFIX.to_string()),
        })
    }

    pub fn stream_key(&self, queue: &str) -> String {
        format!("{}:{}", self.prefix, queue)
    }

    pub fn delayed_key(&self) -> String {
        format!("{}:delayed", self.prefix)
    }
}

#[async_trait]
impl TaskSubmitter for RedisStreamsTaskSubmitter {
    #[instrument(
        skip(self, task),
        fields(
            task_id = %task.id,
            job = %task.job_class_name,
            tenant = %task.tenant,
            queue = %task.queue_name
        ),
        err
    )]
    async fn submit(&self, task: &DurableTask) -> Result<(), TaskSubmitError> {
        let body = serde_json::to_string(task)
            .map_err(|e| TaskSubmitError::Serialization(e.to_string()))?;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TaskSubmitError::Connection(e.to_string()))?;

        match task.schedule_time.filter(|at| *at > Utc::now()) {
            Some(at) => {
                let _: i64 = redis::cmd("ZADD")
                    .arg(self.delayed_key())
                    .arg(at.timestamp())
                    .arg(&body)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| TaskSubmitError::Command(format!("ZADD failed: {e}")))?;
            }
            None => {
                let _: String = redis::cmd("XADD")
                    .arg(self.stream_key(&task.queue_name))
                    .arg("*")
                    .arg("task_id")
                    .arg(task.id.to_string())
                    .arg("job_class_name")
                    .arg(&task.job_class_name)
                    .arg("tenant")
                    .arg(task.tenant.as_str())
                    .arg("task")
                    .arg(&body)
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| TaskSubmitError::Command(format!("XADD failed: {e}")))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_derived_from_prefix() {
        let submitter = RedisStreamsTaskSubmitter::new("redis://localhost:6379", None).unwrap();
        assert_eq!(submitter.stream_key("webhooks"), "cadence:tasks:webhooks");
        assert_eq!(submitter.delayed_key(), "cadence:tasks:delayed");

        let custom =
            RedisStreamsTaskSubmitter::new("redis://localhost:6379", Some("acme".into())).unwrap();
        assert_eq!(custom.stream_key("default"), "acme:default");
    }

    #[test]
    fn malformed_url_is_a_connection_error() {
        let err = RedisStreamsTaskSubmitter::new("not a url", None).unwrap_err();
        assert!(matches!(err, TaskSubmitError::Connection(_)));
    }
}
