//! In-memory task submitter for tests/dev.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{DurableTask, TaskSubmitError, TaskSubmitter};

/// Keeps submitted tasks until they are taken for manual dispatch.
#[derive(Debug, Default)]
pub struct InMemoryTaskSubmitter {
    tasks: Mutex<Vec<DurableTask>>,
    unavailable: AtomicBool,
}

impl InMemoryTaskSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn submitted(&self) -> Vec<DurableTask> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Remove and return every pending task.
    pub fn drain(&self) -> Vec<DurableTask> {
        std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// While set, every submission fails with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskSubmitter for InMemoryTaskSubmitter {
    async fn submit(&self, task: &DurableTask) -> Result<(), TaskSubmitError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TaskSubmitError::Connection(
                "in-memory task queue unavailable".to_string(),
            ));
        }
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task.clone());
        Ok(())
    }
}
