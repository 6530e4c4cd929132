//! Concrete job kinds.

pub mod email;
pub mod inventory;
pub mod migrations;
pub mod monitoring;
pub mod shop;
pub mod tags;
pub mod webhook;

pub use email::{CustomerEmailPayload, CustomerSendEmailJob, MerchantEmailPayload, MerchantSendEmailJob};
pub use inventory::{
    EnqueueInventoryFailureEmailJob, FrequencyPayload, NotificationFrequency,
    SendInventoryFailureEmailJob,
};
pub use migrations::{
    EnqueueTransitionFailedContractsToActiveJob, TransitionFailedContractsToActiveJob,
    TransitionPayload,
};
pub use monitoring::{MonitorPayload, SubscriptionMonitorJob};
pub use shop::{DisableShopJob, DisableShopPayload};
pub use tags::{FIRST_ORDER_TAGS, RECURRING_ORDER_TAGS, TagOrderPayload, TagSubscriptionOrderJob};
pub use webhook::ExternalWebhookJob;
