//! Collaborators available to job bodies.

use std::sync::Arc;

use chrono::Duration;

use crate::notify::{EventForwarder, Notifier, RecordingForwarder, RecordingNotifier};
use crate::platform::{CommercePlatform, InMemoryCommercePlatform};
use crate::shop_store::{InMemoryShopStore, ShopStore};

#[derive(Clone)]
pub struct JobServices {
    pub platform: Arc<dyn CommercePlatform>,
    pub notifier: Arc<dyn Notifier>,
    pub forwarder: Arc<dyn EventForwarder>,
    pub shops: Arc<dyn ShopStore>,
    pub settings: JobSettings,
}

#[derive(Debug, Clone, Copy)]
pub struct JobSettings {
    /// Delay before the subscription monitor runs again.
    pub monitor_interval: Duration,
    /// Tenants fetched per batch by fan-out jobs.
    pub tenant_batch_size: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            monitor_interval: Duration::minutes(5),
            tenant_batch_size: 100,
        }
    }
}

/// In-memory collaborators, kept typed so callers can inspect what jobs did.
#[derive(Debug, Clone, Default)]
pub struct InMemoryServices {
    pub platform: Arc<InMemoryCommercePlatform>,
    pub notifier: Arc<RecordingNotifier>,
    pub forwarder: Arc<RecordingForwarder>,
    pub shops: Arc<InMemoryShopStore>,
}

impl InMemoryServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn services(&self, settings: JobSettings) -> JobServices {
        JobServices {
            platform: self.platform.clone(),
            notifier: self.notifier.clone(),
            forwarder: self.forwarder.clone(),
            shops: self.shops.clone(),
            settings,
        }
    }
}
