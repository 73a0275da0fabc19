//! # Swipe Diagnostics Storage
//!
//! Persistence for diagnostic and audit log entries.
//!
//! Two backends sit behind the [`LogStorage`] contract:
//!
//! - **IndexedLogStore**: redb tables with a per-stream record cap, for
//!   browser-class hosts
//! - **ChunkedFileStore**: numbered JSONL chunk files with size-based
//!   rotation, for native hosts
//!
//! Both accept writes without blocking the caller. Entries go into a
//! bounded [`WriteQueue`] and a single background worker per backend writes
//! them in order.
//!
//! ## Example
//!
//! ```rust,ignore
//! use swipe_diag_core::{context, Device, LogEntry, LogLevel, LogStream, SessionContext};
//! use swipe_diag_storage::{ChunkedFileStore, LogStorage, QueryOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = ChunkedFileStore::open("/tmp/diag");
//!     store.init().await.unwrap();
//!
//!     let session = SessionContext::new("1.0.0", Device::Android);
//!     store.write(LogEntry::new(LogLevel::Info, "APP_START", context! {}, &session));
//!     store.flush().await;
//!
//!     let page = store.query(&QueryOptions::new()).await.unwrap();
//!     assert_eq!(page.total, 1);
//! }
//! ```

pub mod chunked;
pub mod config;
pub mod error;
pub mod indexed;
pub mod query;
pub mod queue;
pub mod retention;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swipe_diag_core::{HostCapabilities, LogEntry, LogStream};

// Re-exports
pub use chunked::{ChunkedFileStore, ChunkedStoreConfig};
pub use config::StorageConfig;
pub use error::StorageError;
pub use indexed::{IndexedLocation, IndexedLogStore, IndexedStoreConfig};
pub use query::{DEFAULT_PAGE_SIZE, QueryOptions, QueryResult};
pub use queue::{BatchSink, WriteQueue};
pub use retention::{RetentionPolicy, RetentionPolicyBuilder};

/// Contract shared by every storage backend
///
/// Each stream (`logs`, `audit`) is stored and bounded independently.
/// Stored entries are never edited; removal happens only through eviction
/// or [`LogStorage::clear`].
#[async_trait]
pub trait LogStorage: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Prepare the medium and start the flush worker
    ///
    /// Idempotent. On failure the write queue is disabled and later writes
    /// are discarded.
    async fn init(&self) -> Result<(), StorageError>;

    /// Enqueue an entry for persistence
    ///
    /// Never blocks on the medium and never fails.
    fn write(&self, entry: LogEntry);

    /// Every retained entry of a stream in stored order
    async fn read_all(&self, stream: LogStream) -> Result<Vec<LogEntry>, StorageError>;

    /// Filter and paginate across both streams, newest first
    async fn query(&self, options: &QueryOptions) -> Result<QueryResult, StorageError> {
        let mut entries = self.read_all(LogStream::Logs).await?;
        entries.extend(self.read_all(LogStream::Audit).await?);
        Ok(options.apply(entries))
    }

    /// Delete every entry of a stream
    async fn clear(&self, stream: LogStream) -> Result<(), StorageError>;

    /// Best-effort estimate of stored bytes
    async fn size(&self) -> Result<u64, StorageError>;

    /// Wait until every entry queued so far has been written
    async fn flush(&self);

    /// Drain the queue and stop the flush worker
    async fn close(&self);

    /// Entries waiting in the write queue
    fn pending(&self) -> usize;

    /// Entries dropped because the write queue was full
    fn dropped(&self) -> u64;
}

/// Storage backend variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// redb tables with a record-count cap
    Indexed,
    /// Rotating JSONL chunk files
    #[serde(rename = "chunked")]
    ChunkedFile,
}

impl BackendKind {
    /// Pick the backend for a host: native hosts get chunk files
    pub fn for_host(host: &HostCapabilities) -> Self {
        if host.native {
            BackendKind::ChunkedFile
        } else {
            BackendKind::Indexed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Indexed => "indexed",
            BackendKind::ChunkedFile => "chunked",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indexed" | "redb" => Ok(BackendKind::Indexed),
            "chunked" | "file" | "chunked-file" => Ok(BackendKind::ChunkedFile),
            other => Err(StorageError::Config(format!("unknown backend: {other}"))),
        }
    }
}

/// Build a backend from configuration
///
/// Nothing touches the medium until [`LogStorage::init`] runs.
pub fn open_backend(config: &StorageConfig, kind: BackendKind) -> Arc<dyn LogStorage> {
    match kind {
        BackendKind::Indexed => Arc::new(IndexedLogStore::new(config.indexed())),
        BackendKind::ChunkedFile => Arc::new(ChunkedFileStore::new(config.chunked())),
    }
}
