//! Export bundles
//!
//! An export reads both streams, optionally redacts every entry, and wraps
//! them with metadata in one of two layouts:
//!
//! - **JSON**: a pretty-printed `{ "metadata", "logs", "auditLogs" }` object
//! - **JSONL**: the metadata record on the first line, then one entry per
//!   line (logs first, then audit)
//!
//! Delivering the blob (download, share sheet, file) is up to the caller;
//! [`ExportArtifact::write_to`] covers the plain-file case.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use swipe_diag_core::{BuildProfile, Device, LogEntry, LogStream, SessionContext, now_iso};
use swipe_diag_storage::LogStorage;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ExportError;
use crate::redact::Redactor;

/// Prefix of every export file name
pub const EXPORT_FILE_PREFIX: &str = "swipe-diagnostics";

/// Layout of an export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Jsonl,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Jsonl => "jsonl",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Jsonl => "application/x-ndjson",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "jsonl" | "ndjson" => Ok(ExportFormat::Jsonl),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// What to export and how
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Redact both streams before building the bundle
    pub apply_redaction: bool,
    /// Leaving audit entries out is the caller's call to confirm
    pub include_audit: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Json,
            apply_redaction: true,
            include_audit: true,
        }
    }
}

impl ExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub fn with_redaction(mut self, apply: bool) -> Self {
        self.apply_redaction = apply;
        self
    }

    pub fn with_audit(mut self, include: bool) -> Self {
        self.include_audit = include;
        self
    }
}

/// Header record of an export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub exported_at: String,
    pub app_version: String,
    pub build: BuildProfile,
    pub device: Device,
    pub session_id: Uuid,
    pub log_count: usize,
    pub audit_count: usize,
    pub redacted: bool,
}

/// JSON export layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub metadata: ExportMetadata,
    pub logs: Vec<LogEntry>,
    pub audit_logs: Vec<LogEntry>,
}

/// A finished export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    /// `swipe-diagnostics-<timestamp>.<json|jsonl>`
    pub filename: String,
    pub mime_type: &'static str,
    pub content: String,
    pub metadata: ExportMetadata,
}

impl ExportArtifact {
    /// Write the content into `dir` under its file name
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(&self.filename);
        tokio::fs::write(&path, self.content.as_bytes()).await?;

        info!(path = ?path, bytes = self.content.len(), "Wrote export");
        Ok(path)
    }
}

/// Export file name for a timestamp, with `:` made filesystem-safe
pub fn export_filename(exported_at: &str, format: ExportFormat) -> String {
    format!(
        "{}-{}.{}",
        EXPORT_FILE_PREFIX,
        exported_at.replace(':', "-"),
        format.extension()
    )
}

/// Everything an export needs besides the options
pub struct ExportSource<'a> {
    pub storage: &'a dyn LogStorage,
    pub session: &'a SessionContext,
    pub build: BuildProfile,
    pub redactor: &'a Redactor,
}

/// Build an export bundle from stored entries
///
/// Pending writes are flushed first so the bundle includes everything
/// logged before the call.
pub async fn export_logs(
    source: &ExportSource<'_>,
    options: &ExportOptions,
) -> Result<ExportArtifact, ExportError> {
    source.storage.flush().await;

    let mut logs = source.storage.read_all(LogStream::Logs).await?;
    let mut audit_logs = if options.include_audit {
        source.storage.read_all(LogStream::Audit).await?
    } else {
        Vec::new()
    };

    if options.apply_redaction {
        logs = logs.iter().map(|e| source.redactor.redact_entry(e)).collect();
        audit_logs = audit_logs
            .iter()
            .map(|e| source.redactor.redact_entry(e))
            .collect();
    }

    let session = source.session.metadata();
    let metadata = ExportMetadata {
        exported_at: now_iso(),
        app_version: session.app_version,
        build: source.build,
        device: session.device,
        session_id: session.session_id,
        log_count: logs.len(),
        audit_count: audit_logs.len(),
        redacted: options.apply_redaction,
    };

    let content = match options.format {
        ExportFormat::Json => {
            let document = ExportDocument {
                metadata: metadata.clone(),
                logs,
                audit_logs,
            };
            serde_json::to_string_pretty(&document)?
        }
        ExportFormat::Jsonl => {
            let mut out = serde_json::to_string(&metadata)?;
            out.push('\n');
            for entry in logs.iter().chain(audit_logs.iter()) {
                out.push_str(&entry.to_json_line()?);
                out.push('\n');
            }
            out
        }
    };

    debug!(
        format = %options.format,
        logs = metadata.log_count,
        audit = metadata.audit_count,
        redacted = metadata.redacted,
        "Built export"
    );

    Ok(ExportArtifact {
        filename: export_filename(&metadata.exported_at, options.format),
        mime_type: options.format.mime_type(),
        content,
        metadata,
    })
}
