//! DesiCart Core - Shared types library.
//!
//! This crate provides the domain types used across all DesiCart components:
//! - `storefront` - Storage engines, catalog, session identity and cart store
//! - `cli` - Command-line client, migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure cart rules - no I/O, no
//! database access. The same [`Cart`] rules back both the optimistic
//! in-memory cart and the durable engines.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, products, carts and cart mutations

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
