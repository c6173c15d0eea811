//! Catalog store and seed data.
//!
//! The seed catalog ships inside the binary. It initializes the local
//! engine's catalog key, seeds the `products` table, and is the fallback
//! catalog whenever a backend cannot be read.

use std::collections::HashSet;
use std::sync::LazyLock;

use tracing::error;

use desicart_core::{Category, Product, ProductId};

use crate::error::{Result, StorageError};
use crate::storage::StorageEngine;

const SEED_CATALOG_JSON: &str = include_str!("../seed/catalog.json");

static SEED_CATALOG: LazyLock<Vec<Product>> = LazyLock::new(|| {
    parse_catalog(SEED_CATALOG_JSON).unwrap_or_else(|e| {
        error!(error = %e, "Embedded seed catalog is invalid");
        Vec::new()
    })
});

/// The built-in catalog, in seed order.
#[must_use]
pub fn seed_catalog() -> Vec<Product> {
    SEED_CATALOG.clone()
}

/// Parse a JSON array of products, rejecting duplicate IDs.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON and
/// `StorageError::DataCorruption` if two products share an ID.
pub fn parse_catalog(json: &str) -> Result<Vec<Product>> {
    let products: Vec<Product> = serde_json::from_str(json)?;

    let mut seen = HashSet::with_capacity(products.len());
    for product in &products {
        if !seen.insert(&product.id) {
            return Err(StorageError::DataCorruption(format!(
                "duplicate product id {}",
                product.id
            )));
        }
    }

    Ok(products)
}

/// Read-only snapshot of the catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Load the catalog through an engine.
    ///
    /// Never fails: engines fall back to the seed catalog.
    pub async fn load<E: StorageEngine>(engine: &E) -> Self {
        Self::from_products(engine.get_products().await)
    }

    /// Wrap an already loaded product list.
    #[must_use]
    pub const fn from_products(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Look up a product by identity.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Products matching a search term within an optional category.
    ///
    /// The term is matched case-insensitively against title and
    /// description; an empty term and `None` category match everything.
    #[must_use]
    pub fn filter(&self, search: &str, category: Option<Category>) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .filter(|p| p.matches_search(search))
            .collect()
    }

    /// Iterate over all products.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    /// Number of products.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
