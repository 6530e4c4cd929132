//! Durable task transport behind the durable-queue scheduler.
//!
//! A [`DurableTask`] is the wire form of one enqueued job. Submitters only
//! need to persist it; delivery back to the dispatch endpoint belongs to the
//! external queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cadence_core::TenantId;

use crate::jobs::{EnqueueOptions, JobKind};

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis_streams;

pub use in_memory::InMemoryTaskSubmitter;
#[cfg(feature = "redis")]
pub use redis_streams::RedisStreamsTaskSubmitter;

/// One job as handed to the external queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableTask {
    pub id: Uuid,
    pub job_class_name: String,
    pub tenant: TenantId,
    pub payload: serde_json::Value,
    pub queue_name: String,
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub schedule_time: Option<DateTime<Utc>>,
}

impl DurableTask {
    pub fn from_job(job: &JobKind, options: EnqueueOptions) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::now_v7(),
            job_class_name: job.name().to_string(),
            tenant: job.tenant().clone(),
            payload: job.payload_json()?,
            queue_name: job.queue().to_string(),
            schedule_time: options.schedule_time,
        })
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskSubmitError {
    #[error("task queue connection error: {0}")]
    Connection(String),
    #[error("task queue command error: {0}")]
    Command(String),
    #[error("task serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait TaskSubmitter: Send + Sync {
    /// Persist `task`; resolves once the transport acknowledged the write.
    async fn submit(&self, task: &DurableTask) -> Result<(), TaskSubmitError>;
}
