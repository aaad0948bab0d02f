//! Error types for minimart storage.

use minimart_core::EconomyError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// A business rule rejected the operation (insufficient funds, caps,
    /// code checks). Nothing was written.
    #[error(transparent)]
    Economy(#[from] EconomyError),
}
