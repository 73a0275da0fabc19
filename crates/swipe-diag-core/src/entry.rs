//! The structured log entry

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::level::{LogLevel, LogStream};
use crate::session::{Device, SessionContext, now_iso};
use crate::value::{ContextMap, ContextValue};

/// Context key holding the application-supplied correlation id
pub const CORRELATION_ID_KEY: &str = "correlationId";

/// One structured log record
///
/// Entries are immutable once handed to storage. Redaction and export
/// always work on clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// ISO-8601 UTC timestamp, millisecond precision
    pub timestamp: String,
    pub level: LogLevel,
    /// Free-form namespaced event name (e.g. `AUTH_LOGIN_FAILED`)
    pub event: String,
    #[serde(default)]
    pub context: ContextMap,
    pub session_id: Uuid,
    pub app_version: String,
    pub device: Device,
}

impl LogEntry {
    /// Build an entry stamped with the current time and session metadata
    pub fn new(
        level: LogLevel,
        event: impl Into<String>,
        context: ContextMap,
        session: &SessionContext,
    ) -> Self {
        Self::at(now_iso(), level, event, context, session)
    }

    /// Build an entry with an explicit timestamp
    pub fn at(
        timestamp: impl Into<String>,
        level: LogLevel,
        event: impl Into<String>,
        context: ContextMap,
        session: &SessionContext,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            level,
            event: event.into(),
            context,
            session_id: session.session_id(),
            app_version: session.app_version().to_string(),
            device: session.device(),
        }
    }

    /// The stream this entry belongs to
    pub fn stream(&self) -> LogStream {
        self.level.stream()
    }

    /// Correlation id from the context, if present as a string
    pub fn correlation_id(&self) -> Option<&str> {
        self.context
            .get(CORRELATION_ID_KEY)
            .and_then(ContextValue::as_str)
    }

    /// Serialize as a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a single JSON line
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
