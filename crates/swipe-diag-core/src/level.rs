//! Severity levels and the streams they are persisted to

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Severity of a log entry
///
/// Levels are totally ordered. `Audit` sorts highest so that any threshold
/// admits it, but the facade additionally exempts it from filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Audit,
}

impl LogLevel {
    /// All levels in ascending order
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Audit,
    ];

    /// Lowercase name as written on disk
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Audit => "audit",
        }
    }

    /// The stream entries of this level are persisted to
    pub fn stream(&self) -> LogStream {
        match self {
            LogLevel::Audit => LogStream::Audit,
            _ => LogStream::Logs,
        }
    }

    /// Whether this level bypasses threshold filtering
    pub fn is_audit(&self) -> bool {
        matches!(self, LogLevel::Audit)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "audit" => Ok(LogLevel::Audit),
            other => Err(CoreError::InvalidLevel(other.to_string())),
        }
    }
}

/// One of the two independent, separately bounded logging channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    /// Diagnostic entries (debug..error)
    Logs,
    /// Compliance-grade audit entries
    Audit,
}

impl LogStream {
    /// Both streams, logs first
    pub const ALL: [LogStream; 2] = [LogStream::Logs, LogStream::Audit];

    /// Filename prefix used by the chunked file backend
    pub fn file_prefix(&self) -> &'static str {
        match self {
            LogStream::Logs => "logs",
            LogStream::Audit => "audit",
        }
    }

    /// Collection name used by the indexed backend
    pub fn collection(&self) -> &'static str {
        match self {
            LogStream::Logs => "logs",
            LogStream::Audit => "audit_logs",
        }
    }
}

impl fmt::Display for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_prefix())
    }
}

impl FromStr for LogStream {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logs" | "log" => Ok(LogStream::Logs),
            "audit" | "audit_logs" => Ok(LogStream::Audit),
            other => Err(CoreError::InvalidStream(other.to_string())),
        }
    }
}
