//! In-memory shop store for tests/dev.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use cadence_core::TenantId;

use super::{ShopStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShopRecord {
    /// Access tokens of the tenant's sessions.
    pub sessions: Vec<String>,
    pub billing_schedule_active: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryShopStore {
    shops: RwLock<BTreeMap<TenantId, ShopRecord>>,
}

impl InMemoryShopStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Record an installation with one session and an active billing schedule.
    pub fn install(&self, tenant: TenantId, access_token: impl Into<String>) {
        self.shops.write().unwrap_or_else(PoisonError::into_inner).insert(
            tenant,
            ShopRecord {
                sessions: vec![access_token.into()],
                billing_schedule_active: true,
            },
        );
    }

    pub fn record(&self, tenant: &TenantId) -> Option<ShopRecord> {
        self.shops
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tenant)
            .cloned()
    }
}

#[async_trait]
impl ShopStore for InMemoryShopStore {
    async fn has_empty_access_token(&self, tenant: &TenantId) -> Result<bool, StoreError> {
        let shops = self.shops.read().unwrap_or_else(PoisonError::into_inner);
        Ok(shops
            .get(tenant)
            .is_some_and(|shop| shop.sessions.iter().any(String::is_empty)))
    }

    async fn disable(&self, tenant: &TenantId) -> Result<(), StoreError> {
        let mut shops = self.shops.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(shop) = shops.get_mut(tenant) {
            shop.sessions.clear();
            shop.billing_schedule_active = false;
        }
        Ok(())
    }

    async fn active_tenants(
        &self,
        after: Option<&TenantId>,
        limit: usize,
    ) -> Result<Vec<TenantId>, StoreError> {
        let shops = self.shops.read().unwrap_or_else(PoisonError::into_inner);
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        Ok(shops
            .range::<TenantId, _>((lower, Bound::Unbounded))
            .filter(|(_, shop)| shop.billing_schedule_active)
            .map(|(tenant, _)| tenant.clone())
            .take(limit)
            .collect())
    }
}
