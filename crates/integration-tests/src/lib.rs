//! Integration tests for DesiCart.
//!
//! # Running Tests
//!
//! ```bash
//! # Local engine and reconciler tests
//! cargo test -p desicart-integration-tests
//!
//! # Include the PostgreSQL engine
//! DESICART_TEST_DATABASE_URL=postgres://localhost/desicart_test \
//!     cargo test -p desicart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `local_engine` - file-backed engine and session identity
//! - `cart_reconciliation` - optimistic cart store over a real engine
//! - `remote_engine` - `PostgreSQL` engine, skipped without a test database

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

use desicart_core::{Product, ProductId, UserIdentity};
use desicart_storefront::catalog::seed_catalog;
use desicart_storefront::config::DatabaseConfig;
use desicart_storefront::db::{self, ProductRepository};
use desicart_storefront::storage::{FileStore, LocalEngine, RemoteEngine};

/// Environment variable naming the test database.
pub const TEST_DATABASE_URL: &str = "DESICART_TEST_DATABASE_URL";

/// Open a local engine over files in `dir`.
///
/// # Panics
///
/// Panics if the catalog cannot be seeded.
#[must_use]
#[allow(clippy::expect_used)]
pub fn local_engine(dir: &Path) -> LocalEngine<FileStore> {
    LocalEngine::open(FileStore::new(dir)).expect("open local engine")
}

/// A user identity no other test shares.
///
/// # Panics
///
/// Panics if the generated identity is rejected.
#[must_use]
#[allow(clippy::expect_used)]
pub fn unique_user(prefix: &str) -> UserIdentity {
    UserIdentity::parse(&format!("{prefix}-{}", uuid::Uuid::new_v4())).expect("valid identity")
}

/// A product from the seed catalog.
///
/// # Panics
///
/// Panics if `id` is not in the seed catalog.
#[must_use]
#[allow(clippy::expect_used)]
pub fn seed_product(id: &str) -> Product {
    seed_catalog()
        .into_iter()
        .find(|p| p.id.as_str() == id)
        .expect("product in seed catalog")
}

/// Parse a product id.
///
/// # Panics
///
/// Panics if `id` is empty.
#[must_use]
#[allow(clippy::expect_used)]
pub fn product_id(id: &str) -> ProductId {
    ProductId::parse(id).expect("valid product id")
}

/// Connect to the test database, migrate it and load the seed catalog.
///
/// Returns `None` when `DESICART_TEST_DATABASE_URL` is unset so callers can
/// skip.
///
/// # Panics
///
/// Panics if the database is configured but unusable.
#[allow(clippy::expect_used)]
pub async fn remote_engine() -> Option<RemoteEngine> {
    let url = std::env::var(TEST_DATABASE_URL).ok()?;
    let config = DatabaseConfig {
        url: SecretString::from(url),
        max_connections: 5,
        catalog_ttl: Duration::from_secs(60),
    };

    let pool = db::create_pool(&config).await.expect("connect test database");
    db::migrate(&pool).await.expect("migrate test database");
    ProductRepository::new(&pool)
        .upsert_all(&seed_catalog())
        .await
        .expect("seed test database");

    Some(RemoteEngine::new(pool, config.catalog_ttl))
}
