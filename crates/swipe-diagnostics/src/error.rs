//! Error types for swipe-diagnostics

use swipe_diag_storage::StorageError;
use thiserror::Error;

/// A caller-supplied redaction pattern failed to compile
#[derive(Debug, Error)]
#[error("Invalid redaction pattern `{pattern}`: {source}")]
pub struct RedactionError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Errors surfaced by an export
///
/// Export is the one operation that reports failure to its caller.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Reading the stored streams failed
    #[error("Failed to read stored logs: {0}")]
    Storage(#[from] StorageError),

    /// Building the export document failed
    #[error("Failed to serialize export: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing the artifact to disk failed
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid diagnostics configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidEnv { var: &'static str, message: String },
}
