//! Error types for the diagnostics core

use thiserror::Error;

/// Errors raised while parsing core types from text
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Invalid log stream: {0}")]
    InvalidStream(String),

    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[error("Invalid build profile: {0}")]
    InvalidBuild(String),
}
