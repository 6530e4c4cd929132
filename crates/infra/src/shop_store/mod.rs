//! Tenant installation records: sessions and billing schedules.

use async_trait::async_trait;

use cadence_core::TenantId;

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryShopStore, ShopRecord};
pub use postgres::PostgresShopStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait ShopStore: Send + Sync {
    /// Whether the tenant has a session whose access token is empty.
    async fn has_empty_access_token(&self, tenant: &TenantId) -> Result<bool, StoreError>;

    /// Delete the tenant's sessions and deactivate its billing schedules.
    async fn disable(&self, tenant: &TenantId) -> Result<(), StoreError>;

    /// Tenants with an active billing schedule, ordered by shop domain,
    /// strictly after `after`, at most `limit`.
    async fn active_tenants(
        &self,
        after: Option<&TenantId>,
        limit: usize,
    ) -> Result<Vec<TenantId>, StoreError>;
}
