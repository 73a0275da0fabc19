//! Retention limits and eviction decisions
//!
//! The two backends bound the same streams in different units: the indexed
//! store caps the record count, the chunked store caps chunk size and the
//! number of retained chunks. Both evict oldest-first.

use serde::{Deserialize, Serialize};
use swipe_diag_core::LogStream;

/// Default record cap for the `logs` stream (indexed backend)
pub const DEFAULT_MAX_LOG_RECORDS: usize = 5_000;
/// Default record cap for the `audit` stream (indexed backend)
pub const DEFAULT_MAX_AUDIT_RECORDS: usize = 10_000;
/// Default target size of one chunk file (chunked backend)
pub const DEFAULT_TARGET_CHUNK_BYTES: u64 = 500 * 1024;
/// Default number of chunk files retained per stream (chunked backend)
pub const DEFAULT_MAX_CHUNKS: usize = 10;

/// Retention limits for both backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    max_log_records: usize,
    max_audit_records: usize,
    target_chunk_bytes: u64,
    max_chunks: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_log_records: DEFAULT_MAX_LOG_RECORDS,
            max_audit_records: DEFAULT_MAX_AUDIT_RECORDS,
            target_chunk_bytes: DEFAULT_TARGET_CHUNK_BYTES,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

impl RetentionPolicy {
    /// Start a builder from the defaults
    pub fn builder() -> RetentionPolicyBuilder {
        RetentionPolicyBuilder::new()
    }

    /// Record cap for a stream
    pub fn max_records(&self, stream: LogStream) -> usize {
        match stream {
            LogStream::Logs => self.max_log_records,
            LogStream::Audit => self.max_audit_records,
        }
    }

    /// Target size of one chunk file in bytes
    pub fn target_chunk_bytes(&self) -> u64 {
        self.target_chunk_bytes
    }

    /// Maximum chunk files retained per stream
    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    /// How many of the oldest records to delete to get back under the cap
    pub fn records_to_evict(&self, stream: LogStream, current_count: usize) -> usize {
        current_count.saturating_sub(self.max_records(stream))
    }

    /// Whether appending `incoming` bytes to a chunk of `current` bytes
    /// should open a new chunk instead
    ///
    /// An empty chunk always accepts the batch, so an oversized batch never
    /// leaves an empty file behind.
    pub fn should_rotate(&self, current: u64, incoming: u64) -> bool {
        current > 0 && current.saturating_add(incoming) > self.target_chunk_bytes
    }

    /// Select the chunk numbers to delete, oldest first
    ///
    /// `existing` may be in any order; the highest `max_chunks` numbers are
    /// kept.
    pub fn chunks_to_evict(&self, existing: &[u32]) -> Vec<u32> {
        if existing.len() <= self.max_chunks {
            return Vec::new();
        }

        let mut sorted = existing.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let excess = sorted.len().saturating_sub(self.max_chunks);
        sorted.into_iter().take(excess).collect()
    }
}

/// Builder for RetentionPolicy
#[derive(Debug, Default)]
pub struct RetentionPolicyBuilder {
    max_log_records: Option<usize>,
    max_audit_records: Option<usize>,
    target_chunk_bytes: Option<u64>,
    max_chunks: Option<usize>,
}

impl RetentionPolicyBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the record cap for the `logs` stream
    pub fn max_log_records(mut self, max: usize) -> Self {
        self.max_log_records = Some(max);
        self
    }

    /// Set the record cap for the `audit` stream
    pub fn max_audit_records(mut self, max: usize) -> Self {
        self.max_audit_records = Some(max);
        self
    }

    /// Set the target chunk size in bytes
    pub fn target_chunk_bytes(mut self, bytes: u64) -> Self {
        self.target_chunk_bytes = Some(bytes);
        self
    }

    /// Set the number of retained chunks per stream (at least one)
    pub fn max_chunks(mut self, max: usize) -> Self {
        self.max_chunks = Some(max.max(1));
        self
    }

    /// Build the RetentionPolicy
    pub fn build(self) -> RetentionPolicy {
        let mut policy = RetentionPolicy::default();

        if let Some(max) = self.max_log_records {
            policy.max_log_records = max;
        }
        if let Some(max) = self.max_audit_records {
            policy.max_audit_records = max;
        }
        if let Some(bytes) = self.target_chunk_bytes {
            policy.target_chunk_bytes = bytes;
        }
        if let Some(max) = self.max_chunks {
            policy.max_chunks = max;
        }

        policy
    }
}
