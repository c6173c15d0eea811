//! Unified storage error type.
//!
//! Engines return `StorageError` from their fallible operations; the
//! degradation policy in [`crate::storage::StorageEngine`] decides which of
//! them the caller ever sees.

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::RepositoryError;

/// Errors raised by a storage engine.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Reading or writing the local store failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The engine is not configured correctly.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stored data violates an invariant.
    #[error("Data corruption: {0}")]
    DataCorruption(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Result type alias for `StorageError`.
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::DataCorruption("cart blob is not an object".to_string());
        assert_eq!(err.to_string(), "Data corruption: cart blob is not an object");

        let err = StorageError::from(RepositoryError::NotFound("product 99".to_string()));
        assert_eq!(err.to_string(), "Database error: not found: product 99");
    }

    #[test]
    fn test_storage_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = StorageError::from(io);
        assert!(matches!(err, StorageError::Io(_)));
    }
}
