//! Catalog browsing.

use desicart_core::{Category, Product};
use desicart_storefront::{Catalog, Engine, StorefrontConfig};

/// List products matching `search` within an optional category.
///
/// # Errors
///
/// Returns an error if the category is unknown or the engine cannot be built.
pub async fn list(search: &str, category: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let category = category.map(str::parse::<Category>).transpose()?;

    let config = StorefrontConfig::from_env()?;
    let engine = Engine::from_config(&config).await?;
    let catalog = Catalog::load(&engine).await;

    let products = catalog.filter(search, category);
    print_products(&products);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_products(products: &[&Product]) {
    if products.is_empty() {
        println!("No products found");
        return;
    }
    for product in products {
        let discount = product
            .discount_percent()
            .map(|percent| format!(" ({percent}% off)"))
            .unwrap_or_default();
        println!(
            "{:>4}  {:<11}  {:>10}{discount}  {}",
            product.id.as_str(),
            product.category,
            product.price.to_string(),
            product.title
        );
    }
    println!("{} products", products.len());
}
