//! Logger facade
//!
//! Five entry points share one pipeline: build the entry, drop it if it is
//! below the minimum level (audit never is), echo it to the developer
//! console if enabled, and hand it to storage. Nothing here waits on the
//! medium or returns an error; a log call must never be what takes the
//! host down.

use std::sync::Arc;

use swipe_diag_core::{ContextMap, LogEntry, LogLevel, SessionContext};
use swipe_diag_storage::LogStorage;

/// `tracing` target used for console echo
pub const ECHO_TARGET: &str = "swipe_diag::echo";

/// Handle for emitting diagnostic and audit entries
///
/// Cheap to clone; every clone writes to the same storage backend.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    session: SessionContext,
    storage: Arc<dyn LogStorage>,
    min_level: LogLevel,
    console_echo: bool,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("session_id", &self.inner.session.session_id())
            .field("backend", &self.inner.storage.kind())
            .field("min_level", &self.inner.min_level)
            .field("console_echo", &self.inner.console_echo)
            .finish()
    }
}

impl Logger {
    pub fn new(
        session: SessionContext,
        storage: Arc<dyn LogStorage>,
        min_level: LogLevel,
        console_echo: bool,
    ) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                session,
                storage,
                min_level,
                console_echo,
            }),
        }
    }

    pub fn debug(&self, event: impl Into<String>, context: impl Into<Option<ContextMap>>) {
        self.log(LogLevel::Debug, event, context.into().unwrap_or_default());
    }

    pub fn info(&self, event: impl Into<String>, context: impl Into<Option<ContextMap>>) {
        self.log(LogLevel::Info, event, context.into().unwrap_or_default());
    }

    pub fn warn(&self, event: impl Into<String>, context: impl Into<Option<ContextMap>>) {
        self.log(LogLevel::Warn, event, context.into().unwrap_or_default());
    }

    pub fn error(&self, event: impl Into<String>, context: impl Into<Option<ContextMap>>) {
        self.log(LogLevel::Error, event, context.into().unwrap_or_default());
    }

    /// Record an audit entry; always persisted regardless of level
    pub fn audit(&self, event: impl Into<String>, context: ContextMap) {
        self.log(LogLevel::Audit, event, context);
    }

    /// Whether an entry at `level` would be kept
    ///
    /// Useful to skip building an expensive context.
    pub fn would_log(&self, level: LogLevel) -> bool {
        level.is_audit() || level >= self.inner.min_level
    }

    /// Shared pipeline behind every level method
    pub fn log(&self, level: LogLevel, event: impl Into<String>, context: ContextMap) {
        if !self.would_log(level) {
            return;
        }

        let entry = LogEntry::new(level, event, context, &self.inner.session);

        if self.inner.console_echo {
            echo(&entry);
        }

        self.inner.storage.write(entry);
    }

    pub fn min_level(&self) -> LogLevel {
        self.inner.min_level
    }

    pub fn session(&self) -> &SessionContext {
        &self.inner.session
    }
}

fn echo(entry: &LogEntry) {
    let context = serde_json::to_string(&entry.context).unwrap_or_default();
    let event = entry.event.as_str();

    match entry.level {
        LogLevel::Debug => tracing::debug!(target: ECHO_TARGET, %context, "{event}"),
        LogLevel::Info => tracing::info!(target: ECHO_TARGET, %context, "{event}"),
        LogLevel::Warn => tracing::warn!(target: ECHO_TARGET, %context, "{event}"),
        LogLevel::Error => tracing::error!(target: ECHO_TARGET, %context, "{event}"),
        LogLevel::Audit => tracing::info!(target: ECHO_TARGET, audit = true, %context, "{event}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swipe_diag_core::{Device, LogStream, context};
    use swipe_diag_storage::{IndexedLogStore, QueryOptions};

    async fn logger(min_level: LogLevel) -> (Logger, Arc<dyn LogStorage>) {
        let storage: Arc<dyn LogStorage> = Arc::new(IndexedLogStore::in_memory());
        storage.init().await.unwrap();
        let session = SessionContext::new("1.0.0", Device::Web);
        (Logger::new(session, Arc::clone(&storage), min_level, false), storage)
    }

    #[tokio::test]
    async fn test_threshold_drops_lower_levels() {
        let (logger, storage) = logger(LogLevel::Warn).await;

        logger.debug("D", None);
        logger.info("I", context! { "k" => 1 });
        logger.warn("W", None);
        logger.error("E", None);
        storage.flush().await;

        let events: Vec<_> = storage
            .read_all(LogStream::Logs)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.event)
            .collect();
        assert_eq!(events, vec!["W", "E"]);
    }

    #[tokio::test]
    async fn test_audit_ignores_threshold() {
        let (logger, storage) = logger(LogLevel::Error).await;

        logger.info("IGNORED", None);
        logger.audit("USER_DELETED_ACCOUNT", context! { "userId" => "u-9" });
        storage.flush().await;

        assert!(storage.read_all(LogStream::Logs).await.unwrap().is_empty());
        let audit = storage.read_all(LogStream::Audit).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].level, LogLevel::Audit);
        assert_eq!(audit[0].context["userId"], "u-9".into());
    }

    #[tokio::test]
    async fn test_entries_carry_session_metadata() {
        let (logger, storage) = logger(LogLevel::Debug).await;
        logger.info("APP_START", None);
        storage.flush().await;

        let page = storage.query(&QueryOptions::new()).await.unwrap();
        let entry = &page.entries[0];
        assert_eq!(entry.session_id, logger.session().session_id());
        assert_eq!(entry.app_version, "1.0.0");
        assert_eq!(entry.device, Device::Web);
    }

    #[tokio::test]
    async fn test_would_log() {
        let (logger, _storage) = logger(LogLevel::Info).await;
        assert!(!logger.would_log(LogLevel::Debug));
        assert!(logger.would_log(LogLevel::Info));
        assert!(logger.would_log(LogLevel::Audit));
    }

    #[tokio::test]
    async fn test_uninitialized_storage_never_panics() {
        let storage: Arc<dyn LogStorage> = Arc::new(IndexedLogStore::in_memory());
        let session = SessionContext::new("1.0.0", Device::Web);
        let logger = Logger::new(session, storage, LogLevel::Debug, true);
        logger.error("EARLY", context! { "phase" => "boot" });
        logger.audit("EARLY_AUDIT", context! {});
    }
}
