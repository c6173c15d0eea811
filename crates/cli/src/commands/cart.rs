//! Cart commands for this installation's identity.
//!
//! Writes go through [`CartStore`], so the tentative cart is shown first and
//! the command waits for the engine to confirm it before exiting.

use std::sync::Arc;

use tracing::warn;

use desicart_core::{Cart, ProductId, UserIdentity};
use desicart_storefront::storage::FileStore;
use desicart_storefront::{
    CartStore, CartView, Catalog, Engine, SessionIdentityProvider, StorageEngine,
    StorefrontConfig, SyncStatus,
};

/// Resolve the identity stored under the configured data directory.
fn identity(config: &StorefrontConfig) -> Result<UserIdentity, Box<dyn std::error::Error>> {
    let provider = SessionIdentityProvider::new(FileStore::new(&config.data_dir));
    Ok(provider.get_or_create_identity()?)
}

/// Print this installation's user identity.
///
/// # Errors
///
/// Returns an error if the identity slot cannot be read or written.
#[allow(clippy::print_stdout)]
pub fn whoami() -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    println!("{}", identity(&config)?);
    Ok(())
}

/// Show the cart.
///
/// # Errors
///
/// Returns an error if configuration, identity or engine setup fails.
pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    let user = identity(&config)?;
    let engine = Engine::from_config(&config).await?;

    print_cart(&engine.get_cart(&user).await);
    Ok(())
}

/// Add one unit of a catalog product.
///
/// # Errors
///
/// Returns an error if the product is not in the catalog or the write fails.
pub async fn add(product_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let product_id = ProductId::parse(product_id)?;
    let config = StorefrontConfig::from_env()?;
    let user = identity(&config)?;
    let engine = Arc::new(Engine::from_config(&config).await?);

    let catalog = Catalog::load(engine.as_ref()).await;
    let product = catalog
        .get(&product_id)
        .ok_or_else(|| format!("unknown product: {product_id}"))?;

    let store = CartStore::open(engine, user).await;
    let tentative = store.add(product);
    print_tentative(&tentative);

    finish(&store.settled().await)
}

/// Set the quantity of a line; `quantity <= 0` removes it.
///
/// # Errors
///
/// Returns an error if the id is invalid or the write fails.
pub async fn set(product_id: &str, quantity: i64) -> Result<(), Box<dyn std::error::Error>> {
    let product_id = ProductId::parse(product_id)?;
    let config = StorefrontConfig::from_env()?;
    let user = identity(&config)?;
    let engine = Arc::new(Engine::from_config(&config).await?);

    let store = CartStore::open(engine, user).await;
    if store.cart().line(&product_id).is_none() {
        warn!(%product_id, "Product is not in the cart");
    }
    let tentative = store.set_quantity(&product_id, quantity);
    print_tentative(&tentative);

    finish(&store.settled().await)
}

fn finish(view: &CartView) -> Result<(), Box<dyn std::error::Error>> {
    print_cart(&view.cart());
    match view.status() {
        SyncStatus::Failed { reason } => Err(format!("cart not saved: {reason}").into()),
        SyncStatus::Synced | SyncStatus::Pending(_) => Ok(()),
    }
}

#[allow(clippy::print_stdout)]
fn print_tentative(cart: &Cart) {
    println!("Saving... ({} items)", cart.item_count());
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for line in cart {
        println!(
            "{:>4}  {:>3} x {:>10}  {:>10}  {}",
            line.product_id().as_str(),
            line.quantity,
            line.product.price.to_string(),
            line.line_total().to_string(),
            line.product.title
        );
    }
    println!(
        "Subtotal ({} items): {}",
        cart.item_count(),
        cart.subtotal()
    );
}
