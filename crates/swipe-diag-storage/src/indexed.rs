//! Size-bounded indexed store backed by redb
//!
//! Browser-class hosts keep entries in a local key-value database with one
//! table per stream (`logs`, `audit_logs`). Records are keyed by their
//! timestamp so that key order is chronological, and each stream is capped
//! by record count: after every flush the lowest keys are removed until the
//! table is back at its cap. There is no byte budget in this backend.
//!
//! Two entries logged within the same millisecond would share a timestamp,
//! so keys carry a per-process sequence suffix (`<timestamp>#<seq>`) and
//! never overwrite each other.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use redb::backends::InMemoryBackend;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use swipe_diag_core::{LogEntry, LogStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::StorageError;
use crate::queue::{BatchSink, WriteQueue};
use crate::retention::RetentionPolicy;
use crate::{BackendKind, LogStorage};

// Key: "<timestamp>#<seq>", Value: LogEntry JSON
const LOGS: TableDefinition<&str, &str> = TableDefinition::new("logs");
const AUDIT_LOGS: TableDefinition<&str, &str> = TableDefinition::new("audit_logs");

fn table_for(stream: LogStream) -> TableDefinition<'static, &'static str, &'static str> {
    match stream {
        LogStream::Logs => LOGS,
        LogStream::Audit => AUDIT_LOGS,
    }
}

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexedLocation {
    /// A database file on disk
    File(PathBuf),
    /// Process memory only
    Memory,
}

/// Configuration for the indexed store
#[derive(Debug, Clone)]
pub struct IndexedStoreConfig {
    pub location: IndexedLocation,
    pub retention: RetentionPolicy,
    pub queue_capacity: usize,
    pub batch_size: usize,
}

impl Default for IndexedStoreConfig {
    fn default() -> Self {
        Self {
            location: IndexedLocation::Memory,
            retention: RetentionPolicy::default(),
            queue_capacity: crate::queue::DEFAULT_QUEUE_CAPACITY,
            batch_size: crate::queue::DEFAULT_BATCH_SIZE,
        }
    }
}

/// Indexed log store
pub struct IndexedLogStore {
    config: IndexedStoreConfig,
    /// Open database; taken out again by `close`
    db: Mutex<Option<Arc<Database>>>,
    closed: AtomicBool,
    init_lock: tokio::sync::Mutex<()>,
    sequence: Arc<AtomicU64>,
    queue: Arc<WriteQueue>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl IndexedLogStore {
    pub fn new(config: IndexedStoreConfig) -> Self {
        let queue = Arc::new(WriteQueue::new(config.queue_capacity, config.batch_size));
        Self {
            config,
            db: Mutex::new(None),
            closed: AtomicBool::new(false),
            init_lock: tokio::sync::Mutex::new(()),
            sequence: Arc::new(AtomicU64::new(0)),
            queue,
            worker: Mutex::new(None),
        }
    }

    /// Store backed by a database file
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(IndexedStoreConfig {
            location: IndexedLocation::File(path.into()),
            ..Default::default()
        })
    }

    /// Store held entirely in memory
    pub fn in_memory() -> Self {
        Self::new(IndexedStoreConfig::default())
    }

    pub fn config(&self) -> &IndexedStoreConfig {
        &self.config
    }

    /// Number of records currently stored for a stream
    pub fn count(&self, stream: LogStream) -> Result<u64, StorageError> {
        let db = self.db()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(table_for(stream))?;
        Ok(table.len()?)
    }

    fn db(&self) -> Result<Arc<Database>, StorageError> {
        self.db.lock().clone().ok_or(StorageError::NotInitialized)
    }

    fn open_database(&self) -> Result<Database, StorageError> {
        let db = match &self.config.location {
            IndexedLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Database::create(path)?
            }
            IndexedLocation::Memory => {
                Database::builder().create_with_backend(InMemoryBackend::new())?
            }
        };

        // Create tables if they don't exist
        let write_txn = db.begin_write()?;
        write_txn.open_table(LOGS)?;
        write_txn.open_table(AUDIT_LOGS)?;
        write_txn.commit()?;

        Ok(db)
    }
}

impl Drop for IndexedLogStore {
    fn drop(&mut self) {
        self.queue.close();
    }
}

#[async_trait]
impl LogStorage for IndexedLogStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Indexed
    }

    #[instrument(skip(self), fields(location = ?self.config.location))]
    async fn init(&self) -> Result<(), StorageError> {
        let _guard = self.init_lock.lock().await;
        if self.db.lock().is_some() {
            return Ok(());
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::NotInitialized);
        }

        let db = match self.open_database() {
            Ok(db) => Arc::new(db),
            Err(e) => {
                self.queue.disable();
                return Err(e);
            }
        };

        *self.db.lock() = Some(Arc::clone(&db));
        self.queue.enable();
        let handle = self.queue.spawn_worker(Arc::new(IndexedSink {
            db,
            retention: self.config.retention,
            sequence: Arc::clone(&self.sequence),
        }));
        if let Some(handle) = handle {
            *self.worker.lock() = Some(handle);
        }

        info!("Indexed log store ready");
        Ok(())
    }

    fn write(&self, entry: LogEntry) {
        self.queue.push(entry);
    }

    async fn read_all(&self, stream: LogStream) -> Result<Vec<LogEntry>, StorageError> {
        let db = self.db()?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(table_for(stream))?;

        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for record in table.iter()? {
            let (_key, value) = record?;
            match LogEntry::from_json_line(value.value()) {
                Ok(entry) => entries.push(entry),
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(%stream, skipped, "Skipped undecodable records");
        }

        Ok(entries)
    }

    async fn clear(&self, stream: LogStream) -> Result<(), StorageError> {
        let db = self.db()?;
        let write_txn = db.begin_write()?;
        write_txn.delete_table(table_for(stream))?;
        write_txn.open_table(table_for(stream))?;
        write_txn.commit()?;

        info!(%stream, "Cleared indexed stream");
        Ok(())
    }

    async fn size(&self) -> Result<u64, StorageError> {
        let db = self.db()?;
        let read_txn = db.begin_read()?;

        let mut total = 0u64;
        for stream in LogStream::ALL {
            let table = read_txn.open_table(table_for(stream))?;
            for record in table.iter()? {
                let (key, value) = record?;
                total += (key.value().len() + value.value().len()) as u64;
            }
        }

        Ok(total)
    }

    async fn flush(&self) {
        self.queue.wait_idle().await;
    }

    async fn close(&self) {
        let _guard = self.init_lock.lock().await;
        self.closed.store(true, Ordering::SeqCst);
        self.queue.close();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Indexed flush worker panicked");
        }

        // The worker's sink held the only other handle
        if self.db.lock().take().is_some() {
            debug!("Indexed database released");
        }
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    fn dropped(&self) -> u64 {
        self.queue.dropped()
    }
}

/// Batch writer owned by the flush worker
struct IndexedSink {
    db: Arc<Database>,
    retention: RetentionPolicy,
    sequence: Arc<AtomicU64>,
}

impl IndexedSink {
    fn write_blocking(
        db: &Database,
        retention: RetentionPolicy,
        sequence: &AtomicU64,
        batch: Vec<LogEntry>,
    ) -> Result<(), StorageError> {
        let write_txn = db.begin_write()?;

        for stream in LogStream::ALL {
            let mut table = write_txn.open_table(table_for(stream))?;
            let mut written = 0usize;

            for entry in batch.iter().filter(|e| e.stream() == stream) {
                let value = entry.to_json_line()?;
                let seq = sequence.fetch_add(1, Ordering::Relaxed);
                let key = format!("{}#{:012}", entry.timestamp, seq);
                table.insert(key.as_str(), value.as_str())?;
                written += 1;
            }

            if written == 0 {
                continue;
            }

            let count = table.len()? as usize;
            let excess = retention.records_to_evict(stream, count);
            for _ in 0..excess {
                if table.pop_first()?.is_none() {
                    break;
                }
            }

            if excess > 0 {
                debug!(%stream, evicted = excess, "Evicted oldest records");
            }
        }

        write_txn.commit()?;
        Ok(())
    }
}

#[async_trait]
impl BatchSink for IndexedSink {
    async fn write_batch(&self, batch: Vec<LogEntry>) -> Result<(), StorageError> {
        let db = Arc::clone(&self.db);
        let retention = self.retention;
        let sequence = Arc::clone(&self.sequence);

        tokio::task::spawn_blocking(move || {
            IndexedSink::write_blocking(&db, retention, &sequence, batch)
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "Indexed flush task failed");
            StorageError::io(e.to_string())
        })?
    }
}
