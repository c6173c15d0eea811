//! Storage engines for the catalog and carts.
//!
//! # Architecture
//!
//! [`StorageEngine`] is the single interface both backends implement:
//!
//! - [`LocalEngine`] - whole-value blobs in a [`KeyValueStore`]
//! - [`RemoteEngine`] - `PostgreSQL` `products` and `cart_items` tables
//!
//! Engines implement only the fallible `try_*` operations. The infallible
//! operations are provided by the trait and apply the degradation policy:
//! a catalog read that fails yields the seed catalog, any cart operation that
//! fails yields the empty cart. Failures are logged, never returned.
//!
//! [`Engine`] picks one backend at configuration time. Code that needs an
//! engine is generic over `StorageEngine`, so tests can pass a fake.

mod kv;
mod local;
mod remote;

use std::future::Future;

use tracing::{info, warn};

use desicart_core::{Cart, Product, ProductId, UserIdentity};

use crate::catalog::seed_catalog;
use crate::config::{EngineKind, StorefrontConfig};
use crate::db;
use crate::error::{Result, StorageError};

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use local::{CARTS_KEY, LocalEngine, PRODUCTS_KEY};
pub use remote::RemoteEngine;

/// Durable backing for the catalog and per-user carts.
pub trait StorageEngine: Send + Sync {
    /// Read the full catalog.
    fn try_get_products(&self) -> impl Future<Output = Result<Vec<Product>>> + Send;

    /// Read a user's cart; a user with no lines has the empty cart.
    fn try_get_cart(&self, user: &UserIdentity) -> impl Future<Output = Result<Cart>> + Send;

    /// Add one unit of `product` to a user's cart and return the new cart.
    ///
    /// Increments the existing line or inserts a line with quantity 1. Never
    /// creates a second line for the same product.
    fn try_add_to_cart(
        &self,
        user: &UserIdentity,
        product: &Product,
    ) -> impl Future<Output = Result<Cart>> + Send;

    /// Set the absolute quantity of a line and return the new cart.
    ///
    /// `quantity <= 0` removes the line. A missing line is left missing.
    fn try_update_cart_quantity(
        &self,
        user: &UserIdentity,
        product_id: &ProductId,
        quantity: i64,
    ) -> impl Future<Output = Result<Cart>> + Send;

    /// Full catalog, falling back to the seed catalog on failure.
    fn get_products(&self) -> impl Future<Output = Vec<Product>> + Send {
        async move {
            match self.try_get_products().await {
                Ok(products) => products,
                Err(e) => {
                    warn!(error = %e, "Failed to fetch products, using fallback catalog");
                    seed_catalog()
                }
            }
        }
    }

    /// A user's cart, or the empty cart on failure.
    fn get_cart(&self, user: &UserIdentity) -> impl Future<Output = Cart> + Send {
        async move {
            match self.try_get_cart(user).await {
                Ok(cart) => cart,
                Err(e) => {
                    warn!(user_id = %user, error = %e, "Failed to fetch cart");
                    Cart::new()
                }
            }
        }
    }

    /// Add one unit of a product; the empty cart on failure.
    fn add_to_cart(
        &self,
        user: &UserIdentity,
        product: &Product,
    ) -> impl Future<Output = Cart> + Send {
        async move {
            match self.try_add_to_cart(user, product).await {
                Ok(cart) => cart,
                Err(e) => {
                    warn!(user_id = %user, product_id = %product.id, error = %e, "Failed to add to cart");
                    Cart::new()
                }
            }
        }
    }

    /// Set a line's quantity; the empty cart on failure.
    fn update_cart_quantity(
        &self,
        user: &UserIdentity,
        product_id: &ProductId,
        quantity: i64,
    ) -> impl Future<Output = Cart> + Send {
        async move {
            match self.try_update_cart_quantity(user, product_id, quantity).await {
                Ok(cart) => cart,
                Err(e) => {
                    warn!(user_id = %user, %product_id, quantity, error = %e, "Failed to update quantity");
                    Cart::new()
                }
            }
        }
    }
}

impl<E: StorageEngine + ?Sized> StorageEngine for std::sync::Arc<E> {
    fn try_get_products(&self) -> impl Future<Output = Result<Vec<Product>>> + Send {
        (**self).try_get_products()
    }

    fn try_get_cart(&self, user: &UserIdentity) -> impl Future<Output = Result<Cart>> + Send {
        (**self).try_get_cart(user)
    }

    fn try_add_to_cart(
        &self,
        user: &UserIdentity,
        product: &Product,
    ) -> impl Future<Output = Result<Cart>> + Send {
        (**self).try_add_to_cart(user, product)
    }

    fn try_update_cart_quantity(
        &self,
        user: &UserIdentity,
        product_id: &ProductId,
        quantity: i64,
    ) -> impl Future<Output = Result<Cart>> + Send {
        (**self).try_update_cart_quantity(user, product_id, quantity)
    }
}

/// The engine selected by configuration.
#[derive(Debug, Clone)]
pub enum Engine {
    Local(LocalEngine<FileStore>),
    Remote(RemoteEngine),
}

impl Engine {
    /// Build the configured engine.
    ///
    /// The local engine seeds its catalog key if needed; the remote engine
    /// connects a pool (migrations are run separately by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the local catalog cannot be seeded or the
    /// database is unreachable.
    pub async fn from_config(config: &StorefrontConfig) -> Result<Self> {
        match config.engine {
            EngineKind::Local => {
                let store = FileStore::new(&config.data_dir);
                let engine = LocalEngine::open(store)?.with_latency(config.simulated_latency);
                info!(data_dir = %config.data_dir.display(), "Using local storage engine");
                Ok(Self::Local(engine))
            }
            EngineKind::Remote => {
                let database = config.require_database()?;
                let pool = db::create_pool(database).await?;
                info!("Using remote storage engine");
                Ok(Self::Remote(RemoteEngine::new(pool, database.catalog_ttl)))
            }
        }
    }
}

impl StorageEngine for Engine {
    fn try_get_products(&self) -> impl Future<Output = Result<Vec<Product>>> + Send {
        async move {
            match self {
                Self::Local(engine) => engine.try_get_products().await,
                Self::Remote(engine) => engine.try_get_products().await,
            }
        }
    }

    fn try_get_cart(&self, user: &UserIdentity) -> impl Future<Output = Result<Cart>> + Send {
        async move {
            match self {
                Self::Local(engine) => engine.try_get_cart(user).await,
                Self::Remote(engine) => engine.try_get_cart(user).await,
            }
        }
    }

    fn try_add_to_cart(
        &self,
        user: &UserIdentity,
        product: &Product,
    ) -> impl Future<Output = Result<Cart>> + Send {
        async move {
            match self {
                Self::Local(engine) => engine.try_add_to_cart(user, product).await,
                Self::Remote(engine) => engine.try_add_to_cart(user, product).await,
            }
        }
    }

    fn try_update_cart_quantity(
        &self,
        user: &UserIdentity,
        product_id: &ProductId,
        quantity: i64,
    ) -> impl Future<Output = Result<Cart>> + Send {
        async move {
            match self {
                Self::Local(engine) => {
                    engine
                        .try_update_cart_quantity(user, product_id, quantity)
                        .await
                }
                Self::Remote(engine) => {
                    engine
                        .try_update_cart_quantity(user, product_id, quantity)
                        .await
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Engine whose backend is always unreachable.
    struct Unreachable;

    fn unreachable_error() -> StorageError {
        StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "backend unreachable",
        ))
    }

    impl StorageEngine for Unreachable {
        async fn try_get_products(&self) -> Result<Vec<Product>> {
            Err(unreachable_error())
        }

        async fn try_get_cart(&self, _user: &UserIdentity) -> Result<Cart> {
            Err(unreachable_error())
        }

        async fn try_add_to_cart(&self, _user: &UserIdentity, _product: &Product) -> Result<Cart> {
            Err(unreachable_error())
        }

        async fn try_update_cart_quantity(
            &self,
            _user: &UserIdentity,
            _product_id: &ProductId,
            _quantity: i64,
        ) -> Result<Cart> {
            Err(unreachable_error())
        }
    }

    fn user() -> UserIdentity {
        UserIdentity::parse("u1").unwrap()
    }

    #[tokio::test]
    async fn test_get_products_falls_back_to_seed_catalog() {
        let products = Unreachable.get_products().await;
        assert!(!products.is_empty());
        assert_eq!(products, seed_catalog());
    }

    #[tokio::test]
    async fn test_cart_operations_degrade_to_empty_cart() {
        let product = seed_catalog().remove(0);

        assert!(Unreachable.get_cart(&user()).await.is_empty());
        assert!(Unreachable.add_to_cart(&user(), &product).await.is_empty());
        assert!(
            Unreachable
                .update_cart_quantity(&user(), &product.id, 3)
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_arc_engine_delegates() {
        let engine = std::sync::Arc::new(Unreachable);
        assert!(engine.try_get_cart(&user()).await.is_err());
    }
}
