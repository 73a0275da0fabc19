//! Storage configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use swipe_diag_core::HostCapabilities;

use crate::BackendKind;
use crate::chunked::ChunkedStoreConfig;
use crate::indexed::{IndexedLocation, IndexedStoreConfig};
use crate::queue::{DEFAULT_BATCH_SIZE, DEFAULT_QUEUE_CAPACITY};
use crate::retention::RetentionPolicy;

/// Directory used by the chunked backend when none is configured
pub const DEFAULT_LOG_DIR: &str = "logs";
/// Database file name used by the indexed backend inside `data_dir`
pub const INDEXED_DB_FILE: &str = "diagnostics.redb";

/// Backend-independent storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where logs live on disk
    ///
    /// The indexed backend keeps its database in memory when unset.
    pub data_dir: Option<PathBuf>,

    /// Force a backend instead of choosing from host capabilities
    pub backend: Option<BackendKind>,

    /// Entries held in memory before the oldest are dropped
    pub queue_capacity: usize,

    /// Entries written per flush pass
    pub batch_size: usize,

    /// fsync chunk files after each append
    pub sync_writes: bool,

    pub retention: RetentionPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            backend: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            sync_writes: false,
            retention: RetentionPolicy::default(),
        }
    }
}

impl StorageConfig {
    /// Settings rooted at a data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Default::default()
        }
    }

    /// Backend to use on this host
    pub fn resolve_backend(&self, host: &HostCapabilities) -> BackendKind {
        self.backend.unwrap_or_else(|| BackendKind::for_host(host))
    }

    /// Directory for chunk files
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
    }

    pub fn chunked(&self) -> ChunkedStoreConfig {
        ChunkedStoreConfig {
            dir: self.log_dir(),
            retention: self.retention,
            queue_capacity: self.queue_capacity,
            batch_size: self.batch_size,
            sync_writes: self.sync_writes,
        }
    }

    pub fn indexed(&self) -> IndexedStoreConfig {
        let location = match &self.data_dir {
            Some(dir) => IndexedLocation::File(dir.join(INDEXED_DB_FILE)),
            None => IndexedLocation::Memory,
        };

        IndexedStoreConfig {
            location,
            retention: self.retention,
            queue_capacity: self.queue_capacity,
            batch_size: self.batch_size,
        }
    }
}
