//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! desicart migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DESICART_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Embedded from `crates/storefront/migrations/` at build time.

use thiserror::Error;
use tracing::info;

use desicart_storefront::config::{ConfigError, DatabaseConfig};
use desicart_storefront::db;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the storefront migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database URL is missing, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();
    let config = DatabaseConfig::from_env()?;

    info!("Connecting to database...");
    let pool = db::create_pool(&config).await?;

    info!("Running migrations...");
    db::migrate(&pool).await?;

    info!("Migrations complete");
    Ok(())
}
