//! DesiCart storefront persistence layer.
//!
//! The catalog and per-user carts live behind a [`storage::StorageEngine`]
//! with a local key-value implementation and a `PostgreSQL` implementation.
//! [`cart::CartStore`] applies cart changes optimistically and confirms them
//! against the engine in the background. [`session`] supplies the stable
//! identity carts are partitioned by.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod session;
pub mod storage;

pub use cart::{CartStore, CartView, SyncStatus};
pub use catalog::Catalog;
pub use config::StorefrontConfig;
pub use error::StorageError;
pub use session::SessionIdentityProvider;
pub use storage::{Engine, StorageEngine};
