//! Remote storage engine backed by `PostgreSQL`.
//!
//! The catalog is cached in memory via `moka` for the configured TTL. Cart
//! operations always go to the database; additions are a single atomic
//! upsert, so concurrent adds from several clients cannot lose increments.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use desicart_core::{Cart, CartLine, Product, ProductId, UserIdentity};

use super::StorageEngine;
use crate::db::{CartItemRepository, ProductRepository};
use crate::error::Result;

const CATALOG_CACHE_KEY: &str = "catalog";

/// Storage engine over the `products` and `cart_items` tables.
#[derive(Clone)]
pub struct RemoteEngine {
    pool: PgPool,
    catalog: Cache<&'static str, Arc<Vec<Product>>>,
}

impl std::fmt::Debug for RemoteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEngine")
            .field("pool_size", &self.pool.size())
            .field("catalog_cached", &self.catalog.contains_key(CATALOG_CACHE_KEY))
            .finish()
    }
}

impl RemoteEngine {
    /// Create an engine over `pool`, caching the catalog for `catalog_ttl`.
    #[must_use]
    pub fn new(pool: PgPool, catalog_ttl: Duration) -> Self {
        let catalog = Cache::builder()
            .max_capacity(1)
            .time_to_live(catalog_ttl)
            .build();

        Self { pool, catalog }
    }

    /// The connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Drop the cached catalog so the next read hits the database.
    pub async fn invalidate_catalog(&self) {
        self.catalog.invalidate(CATALOG_CACHE_KEY).await;
    }

    fn to_cart(lines: Vec<CartLine>) -> Cart {
        Cart::from_lines(lines)
    }
}

impl StorageEngine for RemoteEngine {
    #[instrument(skip_all)]
    async fn try_get_products(&self) -> Result<Vec<Product>> {
        if let Some(products) = self.catalog.get(CATALOG_CACHE_KEY).await {
            debug!("Catalog cache hit");
            return Ok(products.as_ref().clone());
        }

        let products = ProductRepository::new(&self.pool).list().await?;
        self.catalog
            .insert(CATALOG_CACHE_KEY, Arc::new(products.clone()))
            .await;
        Ok(products)
    }

    #[instrument(skip_all, fields(user_id = %user))]
    async fn try_get_cart(&self, user: &UserIdentity) -> Result<Cart> {
        let lines = CartItemRepository::new(&self.pool)
            .list_for_user(user)
            .await?;
        Ok(Self::to_cart(lines))
    }

    #[instrument(skip_all, fields(user_id = %user, product_id = %product.id))]
    async fn try_add_to_cart(&self, user: &UserIdentity, product: &Product) -> Result<Cart> {
        let lines = CartItemRepository::new(&self.pool)
            .increment(user, &product.id)
            .await?;
        Ok(Self::to_cart(lines))
    }

    #[instrument(skip_all, fields(user_id = %user, product_id = %product_id, quantity))]
    async fn try_update_cart_quantity(
        &self,
        user: &UserIdentity,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Cart> {
        let lines = CartItemRepository::new(&self.pool)
            .set_quantity(user, product_id, quantity)
            .await?;
        Ok(Self::to_cart(lines))
    }
}
