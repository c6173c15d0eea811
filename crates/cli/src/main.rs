//! DesiCart CLI - catalog, cart and database tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (remote engine)
//! desicart migrate
//!
//! # Load the seed catalog, or a JSON file, into the products table
//! desicart seed
//! desicart seed --file catalog.json
//!
//! # Browse the catalog
//! desicart products --search cotton --category home
//!
//! # Work with this installation's cart
//! desicart add 3
//! desicart set 3 4
//! desicart remove 3
//! desicart cart
//! desicart whoami
//! ```
//!
//! The engine is picked by `DESICART_ENGINE` (`local` or `remote`); see
//! `desicart_storefront::config` for the full list of variables.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "desicart")]
#[command(author, version, about = "DesiCart storefront tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Upsert the catalog into the products table
    Seed {
        /// JSON catalog file (defaults to the built-in seed catalog)
        #[arg(short, long)]
        file: Option<String>,
    },
    /// List products
    Products {
        /// Case-insensitive match on title or description
        #[arg(short, long, default_value = "")]
        search: String,

        /// Restrict to one category (mobiles, fashion, home, electronics, grocery)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show the cart
    Cart,
    /// Add one unit of a product to the cart
    Add {
        /// Product id
        product_id: String,
    },
    /// Set the quantity of a cart line (0 or less removes it)
    Set {
        /// Product id
        product_id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line from the cart
    Remove {
        /// Product id
        product_id: String,
    },
    /// Print this installation's user identity
    Whoami,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` overrides the default filter; `DESICART_LOG_FORMAT=json`
/// switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("desicart=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if std::env::var("DESICART_LOG_FORMAT").is_ok_and(|format| format == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(file.as_deref()).await?,
        Commands::Products { search, category } => {
            commands::catalog::list(&search, category.as_deref()).await?;
        }
        Commands::Cart => commands::cart::show().await?,
        Commands::Add { product_id } => commands::cart::add(&product_id).await?,
        Commands::Set {
            product_id,
            quantity,
        } => commands::cart::set(&product_id, quantity).await?,
        Commands::Remove { product_id } => commands::cart::set(&product_id, 0).await?,
        Commands::Whoami => commands::cart::whoami()?,
    }
    Ok(())
}
