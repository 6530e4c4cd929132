//! Infrastructure layer: the job system, collaborators, task transport, config.

pub mod config;
pub mod jobs;
pub mod notify;
pub mod platform;
pub mod shop_store;
pub mod task_queue;
