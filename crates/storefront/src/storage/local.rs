//! Local storage engine.
//!
//! Durable state is two JSON blobs in a [`KeyValueStore`]:
//!
//! - [`PRODUCTS_KEY`] - the catalog snapshot, seeded on first access
//! - [`CARTS_KEY`] - every cart on this installation, keyed by user identity
//!
//! Mutations read the whole cart table, change it in memory and write it back.
//! The read-modify-write runs under a lock shared by all clones of the engine,
//! so concurrent mutations in one process never lose an update. Separate
//! processes sharing a data directory are last-writer-wins.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, instrument};

use desicart_core::{Cart, CartMutation, Product, ProductId, UserIdentity};

use super::StorageEngine;
use super::kv::KeyValueStore;
use crate::catalog::seed_catalog;
use crate::error::Result;

/// Key holding the catalog snapshot.
pub const PRODUCTS_KEY: &str = "desicart_products_v1";

/// Key holding the cart table (user identity -> cart lines).
pub const CARTS_KEY: &str = "desicart_carts_v2";

type CartTable = BTreeMap<UserIdentity, Cart>;

/// Storage engine over a client-local key-value store.
///
/// Clones share the store and the write lock.
#[derive(Debug)]
pub struct LocalEngine<S> {
    store: Arc<S>,
    write_lock: Arc<Mutex<()>>,
    latency: Duration,
}

impl<S> Clone for LocalEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            write_lock: Arc::clone(&self.write_lock),
            latency: self.latency,
        }
    }
}

impl<S: KeyValueStore> LocalEngine<S> {
    /// Open the engine, seeding the catalog key if it is absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or written.
    pub fn open(store: S) -> Result<Self> {
        let engine = Self {
            store: Arc::new(store),
            write_lock: Arc::new(Mutex::new(())),
            latency: Duration::ZERO,
        };
        if engine.store.get(PRODUCTS_KEY)?.is_none() {
            engine.seed_products()?;
        }
        Ok(engine)
    }

    /// Delay every operation by `latency`, simulating a slow backend.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    fn seed_products(&self) -> Result<Vec<Product>> {
        let products = seed_catalog();
        self.store
            .put(PRODUCTS_KEY, &serde_json::to_string(&products)?)?;
        debug!(count = products.len(), "Seeded local catalog");
        Ok(products)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn read_products(&self) -> Result<Vec<Product>> {
        match self.store.get(PRODUCTS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => self.seed_products(),
        }
    }

    fn read_table(&self) -> Result<CartTable> {
        let Some(json) = self.store.get(CARTS_KEY)? else {
            return Ok(CartTable::new());
        };
        let table: CartTable = serde_json::from_str(&json)?;

        // Stored blobs may predate deduplication; merge on the way in
        Ok(table
            .into_iter()
            .map(|(user, cart)| (user, Cart::from_lines(cart.into_lines())))
            .collect())
    }

    /// Apply a mutation to one user's cart and write the table back.
    fn mutate(&self, user: &UserIdentity, mutation: &CartMutation) -> Result<Cart> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut table = self.read_table()?;
        let cart = table.entry(user.clone()).or_default();
        mutation.apply(cart);
        let cart = cart.clone();

        self.store.put(CARTS_KEY, &serde_json::to_string(&table)?)?;
        Ok(cart)
    }
}

impl<S: KeyValueStore> StorageEngine for LocalEngine<S> {
    #[instrument(skip_all)]
    async fn try_get_products(&self) -> Result<Vec<Product>> {
        self.simulate_latency().await;
        self.read_products()
    }

    #[instrument(skip_all, fields(user_id = %user))]
    async fn try_get_cart(&self, user: &UserIdentity) -> Result<Cart> {
        self.simulate_latency().await;
        Ok(self.read_table()?.remove(user).unwrap_or_default())
    }

    #[instrument(skip_all, fields(user_id = %user, product_id = %product.id))]
    async fn try_add_to_cart(&self, user: &UserIdentity, product: &Product) -> Result<Cart> {
        self.simulate_latency().await;
        self.mutate(user, &CartMutation::Add(product.clone()))
    }

    #[instrument(skip_all, fields(user_id = %user, product_id = %product_id, quantity))]
    async fn try_update_cart_quantity(
        &self,
        user: &UserIdentity,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Cart> {
        self.simulate_latency().await;
        self.mutate(
            user,
            &CartMutation::SetQuantity {
                product_id: product_id.clone(),
                quantity,
            },
        )
    }
}
