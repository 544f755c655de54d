//! Error types for wallet storage.

use wallet_core::WalletError;

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

    /// A stored key does not have the expected layout.
    #[error("corrupt key in {column_family}")]
    CorruptKey {
        /// Where the key was read from.
        column_family: &'static str,
    },

    /// The write would break a uniqueness rule.
    #[error("write conflict: {0}")]
    Conflict(String),
}

impl From<StoreError> for WalletError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
