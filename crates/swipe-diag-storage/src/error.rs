//! Error types for swipe-diag-storage
//!
//! This module defines the error types used throughout the storage crate.

use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error during storage operations
    #[error("I/O error: {0}")]
    Io(String),

    /// Error during serialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error during deserialization
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid storage configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend was used before `init` completed
    #[error("Storage not initialized")]
    NotInitialized,
}

impl StorageError {
    /// Create a new I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Create a new Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            StorageError::Deserialization(err.to_string())
        } else {
            StorageError::Serialization(err.to_string())
        }
    }
}

macro_rules! impl_from_redb {
    ($($t:ty),*) => {
        $(
            impl From<$t> for StorageError {
                fn from(err: $t) -> Self {
                    StorageError::Database(err.to_string())
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::CommitError,
    redb::StorageError
);
