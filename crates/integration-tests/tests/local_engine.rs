//! Integration tests for the file-backed local engine.

#![allow(clippy::unwrap_used)]

use desicart_integration_tests::{local_engine, product_id, seed_product, unique_user};
use desicart_storefront::config::StorefrontConfig;
use desicart_storefront::session::SessionIdentityProvider;
use desicart_storefront::storage::{CARTS_KEY, FileStore, KeyValueStore, PRODUCTS_KEY};
use desicart_storefront::{Catalog, Engine, StorageEngine};

// =============================================================================
// Cart Scenarios
// =============================================================================

#[tokio::test]
async fn test_cart_scenarios_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let engine = local_engine(dir.path());
    let user = unique_user("local");
    let p = seed_product("1");

    assert!(engine.get_cart(&user).await.is_empty());

    engine.add_to_cart(&user, &p).await;
    let cart = engine.add_to_cart(&user, &p).await;
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.quantity_of(&p.id), 2);

    let cart = engine.update_cart_quantity(&user, &p.id, 7).await;
    assert_eq!(cart.quantity_of(&p.id), 7);

    let cart = engine.update_cart_quantity(&user, &p.id, 0).await;
    assert!(cart.is_empty());

    // Removing again is a no-op
    let cart = engine.update_cart_quantity(&user, &p.id, 0).await;
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_setting_quantity_of_missing_line_returns_current_cart() {
    let dir = tempfile::tempdir().unwrap();
    let engine = local_engine(dir.path());
    let user = unique_user("local");
    let p = seed_product("2");

    engine.add_to_cart(&user, &p).await;
    let cart = engine
        .update_cart_quantity(&user, &product_id("12"), 5)
        .await;

    assert_eq!(cart.len(), 1);
    assert_eq!(cart.quantity_of(&p.id), 1);
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_cart_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let user = unique_user("local");
    let p = seed_product("9");

    {
        let engine = local_engine(dir.path());
        engine.add_to_cart(&user, &p).await;
        engine.update_cart_quantity(&user, &p.id, 3).await;
    }

    let engine = local_engine(dir.path());
    let cart = engine.get_cart(&user).await;
    assert_eq!(cart.quantity_of(&p.id), 3);
}

#[tokio::test]
async fn test_blobs_live_under_fixed_keys() {
    let dir = tempfile::tempdir().unwrap();
    let engine = local_engine(dir.path());
    engine
        .add_to_cart(&unique_user("local"), &seed_product("1"))
        .await;

    assert!(dir.path().join(format!("{PRODUCTS_KEY}.json")).exists());
    assert!(dir.path().join(format!("{CARTS_KEY}.json")).exists());
}

#[tokio::test]
async fn test_catalog_is_seeded_and_filterable() {
    let dir = tempfile::tempdir().unwrap();
    let engine = local_engine(dir.path());

    let catalog = Catalog::load(&engine).await;
    assert_eq!(catalog.len(), 12);
    assert!(catalog.get(&product_id("1")).is_some());
    assert!(!catalog.filter("", None).is_empty());
}

#[tokio::test]
async fn test_corrupt_cart_table_degrades_to_empty_cart() {
    let dir = tempfile::tempdir().unwrap();
    let engine = local_engine(dir.path());
    FileStore::new(dir.path())
        .put(CARTS_KEY, "{ not json")
        .unwrap();

    let user = unique_user("local");
    assert!(engine.get_cart(&user).await.is_empty());
    assert!(engine.try_get_cart(&user).await.is_err());
}

// =============================================================================
// Configuration and Identity
// =============================================================================

#[tokio::test]
async fn test_engine_from_local_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorefrontConfig::local(dir.path());
    let engine = Engine::from_config(&config).await.unwrap();

    assert!(matches!(engine, Engine::Local(_)));
    assert_eq!(engine.get_products().await.len(), 12);
}

#[tokio::test]
async fn test_identity_partitions_cart_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let p = seed_product("4");

    let first = SessionIdentityProvider::new(FileStore::new(dir.path()))
        .get_or_create_identity()
        .unwrap();
    local_engine(dir.path()).add_to_cart(&first, &p).await;

    // A new process sees the same identity and the same cart
    let second = SessionIdentityProvider::new(FileStore::new(dir.path()))
        .get_or_create_identity()
        .unwrap();
    assert_eq!(first, second);
    let cart = local_engine(dir.path()).get_cart(&second).await;
    assert_eq!(cart.quantity_of(&p.id), 1);

    // Another installation gets its own identity and an empty cart
    let other_dir = tempfile::tempdir().unwrap();
    let other = SessionIdentityProvider::new(FileStore::new(other_dir.path()))
        .get_or_create_identity()
        .unwrap();
    assert_ne!(first, other);
    assert!(local_engine(dir.path()).get_cart(&other).await.is_empty());
}
