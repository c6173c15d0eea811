//! Seed the `products` table.
//!
//! Upserts every product from a JSON catalog (the same camelCase format the
//! local engine stores), or the built-in seed catalog when no file is given.
//! Existing rows with the same id are overwritten; cart rows are untouched.

use std::path::Path;

use tracing::info;

use desicart_storefront::catalog::{parse_catalog, seed_catalog};
use desicart_storefront::config::DatabaseConfig;
use desicart_storefront::db::{self, ProductRepository};

/// Seed products from `file_path`, or from the built-in catalog.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the database URL is
/// missing, or the upsert fails.
pub async fn run(file_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Read and validate the catalog before connecting to the database
    let products = match file_path {
        Some(file_path) => {
            let path = Path::new(file_path);
            if !path.exists() {
                return Err(format!("File not found: {file_path}").into());
            }
            info!(path = %file_path, "Loading catalog from file");
            let content = tokio::fs::read_to_string(path).await?;
            parse_catalog(&content)?
        }
        None => seed_catalog(),
    };

    if products.is_empty() {
        return Err("catalog is empty".into());
    }
    info!(products = products.len(), "Parsed catalog");

    let config = DatabaseConfig::from_env()?;
    let pool = db::create_pool(&config).await?;
    info!("Connected to database");

    let written = ProductRepository::new(&pool).upsert_all(&products).await?;
    info!(written, "Seeding complete");

    Ok(())
}
