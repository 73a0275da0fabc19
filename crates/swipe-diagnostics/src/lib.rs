//! Local-first diagnostic and audit logging for Swipe
//!
//! This crate ties the storage backends to the rest of the application:
//! a level-filtering [`Logger`] for call sites, PII redaction, and a
//! query/export engine for the diagnostics screen and support bundles.
//!
//! # Quick Start
//!
//! ```ignore
//! use swipe_diag_core::{context, HostCapabilities};
//! use swipe_diagnostics::{Diagnostics, DiagnosticsConfig, ExportOptions};
//!
//! let diagnostics = Diagnostics::new(
//!     DiagnosticsConfig::production("/data/app/logs").with_app_version("2.3.1"),
//!     HostCapabilities::android(),
//! );
//! diagnostics.init().await;
//!
//! let log = diagnostics.logger();
//! log.info("APP_START", None);
//! log.audit("CONSENT_GRANTED", context! { "scope" => "analytics" });
//!
//! let bundle = diagnostics.export(&ExportOptions::default()).await?;
//! ```
//!
//! # One context object per process
//!
//! [`Diagnostics`] is built once at startup and owns the session, the
//! resolved backend and the redaction rules. Hand out [`Logger`] clones to
//! call sites instead of reaching for globals.

pub mod config;
pub mod error;
pub mod export;
pub mod logger;
pub mod redact;
pub mod telemetry;

pub use config::DiagnosticsConfig;
pub use error::{ConfigError, ExportError, RedactionError};
pub use export::{
    ExportArtifact, ExportDocument, ExportFormat, ExportMetadata, ExportOptions, export_logs,
};
pub use logger::Logger;
pub use redact::{REDACTED, Redactor, redact};
pub use telemetry::SubscriberBuilder;

use std::sync::Arc;

use swipe_diag_core::{HostCapabilities, LogEntry, LogStream, SessionContext};
use swipe_diag_storage::{
    BackendKind, LogStorage, QueryOptions, QueryResult, StorageError, open_backend,
};
use tracing::{error, info};

use crate::export::ExportSource;

/// Process-wide diagnostics context
pub struct Diagnostics {
    config: DiagnosticsConfig,
    session: SessionContext,
    storage: Arc<dyn LogStorage>,
    redactor: Redactor,
    logger: Logger,
}

impl Diagnostics {
    /// Build from configuration, choosing the backend from host capabilities
    ///
    /// No I/O happens until [`Diagnostics::init`].
    pub fn new(config: DiagnosticsConfig, host: HostCapabilities) -> Self {
        let session = SessionContext::for_host(config.app_version.clone(), &host);
        let kind = config.storage.resolve_backend(&host);
        let storage = open_backend(&config.storage, kind);
        Self::with_storage(config, session, storage)
    }

    /// Build around an existing backend
    pub fn with_storage(
        config: DiagnosticsConfig,
        session: SessionContext,
        storage: Arc<dyn LogStorage>,
    ) -> Self {
        let logger = Logger::new(
            session.clone(),
            Arc::clone(&storage),
            config.min_level,
            config.console_echo,
        );

        Self {
            config,
            session,
            storage,
            redactor: Redactor::default_rules().clone(),
            logger,
        }
    }

    /// Replace the redaction rules used by exports
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    /// Prepare storage
    ///
    /// Failure is reported through `tracing` only; log calls keep working
    /// but are discarded.
    pub async fn init(&self) {
        match self.storage.init().await {
            Ok(()) => info!(
                backend = %self.storage.kind(),
                session_id = %self.session.session_id(),
                "Diagnostics ready"
            ),
            Err(e) => error!(
                backend = %self.storage.kind(),
                error = %e,
                "Diagnostics storage unavailable, log entries will be discarded"
            ),
        }
    }

    /// A logger handle for call sites
    pub fn logger(&self) -> Logger {
        self.logger.clone()
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    pub fn backend(&self) -> BackendKind {
        self.storage.kind()
    }

    pub fn storage(&self) -> &Arc<dyn LogStorage> {
        &self.storage
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// One page of entries across both streams, newest first
    pub async fn query(&self, options: &QueryOptions) -> Result<QueryResult, StorageError> {
        self.storage.query(options).await
    }

    pub async fn read_all(&self, stream: LogStream) -> Result<Vec<LogEntry>, StorageError> {
        self.storage.read_all(stream).await
    }

    /// Build an export bundle
    pub async fn export(&self, options: &ExportOptions) -> Result<ExportArtifact, ExportError> {
        let source = ExportSource {
            storage: self.storage.as_ref(),
            session: &self.session,
            build: self.config.build,
            redactor: &self.redactor,
        };
        export_logs(&source, options).await
    }

    pub async fn clear(&self, stream: LogStream) -> Result<(), StorageError> {
        self.storage.clear(stream).await
    }

    /// Clear both streams
    pub async fn clear_all(&self) -> Result<(), StorageError> {
        for stream in LogStream::ALL {
            self.storage.clear(stream).await?;
        }
        Ok(())
    }

    /// Best-effort byte size of stored entries
    pub async fn size(&self) -> Result<u64, StorageError> {
        self.storage.size().await
    }

    /// Wait for queued entries to reach storage
    pub async fn flush(&self) {
        self.storage.flush().await;
    }

    /// Flush and stop the background writer
    pub async fn shutdown(&self) {
        self.storage.close().await;
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("session_id", &self.session.session_id())
            .field("backend", &self.storage.kind())
            .field("config", &self.config)
            .finish()
    }
}
