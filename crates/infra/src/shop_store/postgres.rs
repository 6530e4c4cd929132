//! Postgres-backed shop store.
//!
//! Tables (see `migrations/0001_shops.sql`):
//! - `sessions(id, shop, access_token)`
//! - `billing_schedules(shop, active)`
//!
//! Every statement filters on `shop`, so one tenant's rows are never touched
//! by another tenant's job.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use cadence_core::TenantId;

use super::{ShopStore, StoreError};

pub struct PostgresShopStore {
    pool: Arc<PgPool>,
}

impl PostgresShopStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `database_url` and wrap the pool.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await.map_err(storage)?;
        Ok(Self::new(pool))
    }
}

fn storage(err: sqlx::Error) -> StoreError {
    StoreError::Storage(err.to_string())
}

#[async_trait]
impl ShopStore for PostgresShopStore {
    #[instrument(skip(self, tenant), fields(tenant = %tenant), err)]
    async fn has_empty_access_token(&self, tenant: &TenantId) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sessions
                WHERE shop = $1 AND access_token = ''
            ) AS empty
            "#,
        )
        .bind(tenant.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(storage)?;

        row.try_get::<bool, _>("empty").map_err(storage)
    }

    #[instrument(skip(self, tenant), fields(tenant = %tenant), err)]
    async fn disable(&self, tenant: &TenantId) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query("DELETE FROM sessions WHERE shop = $1")
            .bind(tenant.as_str())
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        sqlx::query("UPDATE billing_schedules SET active = FALSE WHERE shop = $1")
            .bind(tenant.as_str())
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        tx.commit().await.map_err(storage)
    }

    #[instrument(skip(self), err)]
    async fn active_tenants(
        &self,
        after: Option<&TenantId>,
        limit: usize,
    ) -> Result<Vec<TenantId>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT shop
            FROM billing_schedules
            WHERE active AND ($1::TEXT IS NULL OR shop > $1)
            ORDER BY shop
            LIMIT $2
            "#,
        )
        .bind(after.map(TenantId::as_str))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(storage)?;

        rows.iter()
            .map(|row| {
                let shop: String = row.try_get("shop").map_err(storage)?;
                TenantId::new(&shop).map_err(|e| StoreError::Corrupt(e.to_string()))
            })
            .collect()
    }
}
