//! Chunked append-only file store
//!
//! Native hosts keep each stream as a run of numbered newline-delimited JSON
//! files in one directory:
//!
//! ```text
//! logs_0001.jsonl  logs_0002.jsonl  ...
//! audit_0001.jsonl audit_0002.jsonl ...
//! ```
//!
//! Every line is one self-contained `LogEntry`. A batch that would push the
//! current chunk past the target size opens the next chunk number instead,
//! and once a stream holds more than the retained chunk count the oldest
//! files are deleted. Lines left half-written by an abrupt exit are skipped
//! on read.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use swipe_diag_core::{LogEntry, LogStream};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::StorageError;
use crate::queue::{BatchSink, WriteQueue};
use crate::retention::RetentionPolicy;
use crate::{BackendKind, LogStorage};

const CHUNK_EXTENSION: &str = "jsonl";

/// File name of a chunk, e.g. `audit_0003.jsonl`
pub fn chunk_file_name(stream: LogStream, number: u32) -> String {
    format!("{}_{:04}.{}", stream.file_prefix(), number, CHUNK_EXTENSION)
}

/// Parse a chunk file name back into its stream and number
pub fn parse_chunk_file_name(name: &str) -> Option<(LogStream, u32)> {
    let stem = name.strip_suffix(CHUNK_EXTENSION)?.strip_suffix('.')?;
    let (prefix, digits) = stem.rsplit_once('_')?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let stream = LogStream::ALL
        .into_iter()
        .find(|s| s.file_prefix() == prefix)?;
    let number: u32 = digits.parse().ok()?;

    (number > 0).then_some((stream, number))
}

fn slot(stream: LogStream) -> usize {
    match stream {
        LogStream::Logs => 0,
        LogStream::Audit => 1,
    }
}

/// Configuration for the chunked file store
#[derive(Debug, Clone)]
pub struct ChunkedStoreConfig {
    /// Directory holding every chunk file
    pub dir: PathBuf,
    pub retention: RetentionPolicy,
    pub queue_capacity: usize,
    pub batch_size: usize,
    /// fsync after each append (durability vs performance)
    pub sync_writes: bool,
}

impl ChunkedStoreConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            retention: RetentionPolicy::default(),
            queue_capacity: crate::queue::DEFAULT_QUEUE_CAPACITY,
            batch_size: crate::queue::DEFAULT_BATCH_SIZE,
            sync_writes: false,
        }
    }
}

/// Chunked JSONL log store
pub struct ChunkedFileStore {
    inner: Arc<ChunkedInner>,
    queue: Arc<WriteQueue>,
    /// Set once `init` has succeeded
    initialized: tokio::sync::Mutex<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// State shared between the store handle and its flush worker
struct ChunkedInner {
    dir: PathBuf,
    retention: RetentionPolicy,
    sync_writes: bool,
    /// Current chunk number per stream
    current: Mutex<[u32; 2]>,
    /// Serializes appends, rotation and clear
    io_lock: tokio::sync::Mutex<()>,
}

impl ChunkedFileStore {
    pub fn new(config: ChunkedStoreConfig) -> Self {
        let queue = Arc::new(WriteQueue::new(config.queue_capacity, config.batch_size));
        Self {
            inner: Arc::new(ChunkedInner {
                dir: config.dir,
                retention: config.retention,
                sync_writes: config.sync_writes,
                current: Mutex::new([1, 1]),
                io_lock: tokio::sync::Mutex::new(()),
            }),
            queue,
            initialized: tokio::sync::Mutex::new(false),
            worker: Mutex::new(None),
        }
    }

    /// Store in `dir` with default retention
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(ChunkedStoreConfig::new(dir))
    }

    /// Directory holding the chunk files
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Chunk number new writes for a stream go to
    pub fn current_chunk(&self, stream: LogStream) -> u32 {
        self.inner.current_chunk(stream)
    }

    /// Retained chunk numbers for a stream, ascending
    pub async fn chunk_numbers(&self, stream: LogStream) -> Result<Vec<u32>, StorageError> {
        self.inner.chunk_numbers(stream).await
    }

    /// Path of a chunk file
    pub fn chunk_path(&self, stream: LogStream, number: u32) -> PathBuf {
        self.inner.chunk_path(stream, number)
    }
}

impl Drop for ChunkedFileStore {
    fn drop(&mut self) {
        self.queue.close();
    }
}

impl ChunkedInner {
    fn chunk_path(&self, stream: LogStream, number: u32) -> PathBuf {
        self.dir.join(chunk_file_name(stream, number))
    }

    fn current_chunk(&self, stream: LogStream) -> u32 {
        self.current.lock()[slot(stream)]
    }

    fn set_current_chunk(&self, stream: LogStream, number: u32) {
        self.current.lock()[slot(stream)] = number;
    }

    /// Create the directory and list the chunks already in it
    async fn prepare_dir(&self) -> Result<Vec<(LogStream, u32)>, StorageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        self.scan().await
    }

    /// Every chunk file in the directory; a missing directory has none
    async fn scan(&self) -> Result<Vec<(LogStream, u32)>, StorageError> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut found = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            if let Some(name) = name.to_str()
                && let Some(chunk) = parse_chunk_file_name(name)
            {
                found.push(chunk);
            }
        }

        Ok(found)
    }

    async fn chunk_numbers(&self, stream: LogStream) -> Result<Vec<u32>, StorageError> {
        let mut numbers: Vec<u32> = self
            .scan()
            .await?
            .into_iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, n)| n)
            .collect();
        numbers.sort_unstable();
        Ok(numbers)
    }

    /// Current on-disk size of a chunk; missing counts as empty
    async fn chunk_len(&self, path: &Path) -> Result<u64, StorageError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_chunk(&self, stream: LogStream, number: u32) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.chunk_path(stream, number)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn append(&self, path: &Path, payload: &[u8]) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        file.write_all(payload).await?;
        file.flush().await?;

        if self.sync_writes {
            file.sync_data().await?;
        }

        Ok(())
    }

    /// Append one stream's share of a batch, rotating if needed
    ///
    /// Caller holds the I/O lock.
    async fn write_stream(
        &self,
        stream: LogStream,
        entries: &[&LogEntry],
    ) -> Result<(), StorageError> {
        let mut payload = String::new();
        for entry in entries {
            match entry.to_json_line() {
                Ok(line) => {
                    payload.push_str(&line);
                    payload.push('\n');
                }
                Err(e) => warn!(
                    %stream,
                    event = %entry.event,
                    error = %e,
                    "Skipping unserializable entry"
                ),
            }
        }

        if payload.is_empty() {
            return Ok(());
        }

        let mut number = self.current_chunk(stream);
        let current_len = self.chunk_len(&self.chunk_path(stream, number)).await?;
        let incoming = payload.len() as u64;

        let rotated = self.retention.should_rotate(current_len, incoming);
        if rotated {
            number += 1;
            self.set_current_chunk(stream, number);
            debug!(%stream, chunk = number, "Rotated to new chunk");
        }

        self.append(&self.chunk_path(stream, number), payload.as_bytes())
            .await?;
        trace!(%stream, chunk = number, bytes = incoming, "Appended batch");

        if rotated {
            self.evict_old_chunks(stream).await?;
        }

        Ok(())
    }

    async fn evict_old_chunks(&self, stream: LogStream) -> Result<(), StorageError> {
        let numbers = self.chunk_numbers(stream).await?;
        for number in self.retention.chunks_to_evict(&numbers) {
            self.remove_chunk(stream, number).await?;
            debug!(%stream, chunk = number, "Evicted oldest chunk");
        }
        Ok(())
    }

    async fn read_chunk(&self, stream: LogStream, number: u32, out: &mut Vec<LogEntry>) -> usize {
        let path = self.chunk_path(stream, number);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = ?path, error = %e, "Chunk unreadable, treating as empty");
                return 0;
            }
        };

        let mut skipped = 0;
        for line in String::from_utf8_lossy(&bytes).lines() {
            if line.trim().is_empty() {
                continue;
            }
            match LogEntry::from_json_line(line) {
                Ok(entry) => out.push(entry),
                Err(_) => skipped += 1,
            }
        }
        skipped
    }
}

#[async_trait]
impl BatchSink for ChunkedInner {
    async fn write_batch(&self, batch: Vec<LogEntry>) -> Result<(), StorageError> {
        let _io = self.io_lock.lock().await;

        let mut first_error = None;
        for stream in LogStream::ALL {
            let entries: Vec<&LogEntry> = batch.iter().filter(|e| e.stream() == stream).collect();
            if entries.is_empty() {
                continue;
            }

            if let Err(e) = self.write_stream(stream, &entries).await {
                warn!(%stream, count = entries.len(), error = %e, "Failed to append chunk");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LogStorage for ChunkedFileStore {
    fn kind(&self) -> BackendKind {
        BackendKind::ChunkedFile
    }

    #[instrument(skip(self), fields(dir = ?self.inner.dir))]
    async fn init(&self) -> Result<(), StorageError> {
        let mut initialized = self.initialized.lock().await;
        if *initialized {
            return Ok(());
        }

        let chunks = match self.inner.prepare_dir().await {
            Ok(chunks) => chunks,
            Err(e) => {
                self.queue.disable();
                return Err(e);
            }
        };

        for stream in LogStream::ALL {
            let latest = chunks
                .iter()
                .filter(|(s, _)| *s == stream)
                .map(|(_, n)| *n)
                .max()
                .unwrap_or(1);
            self.inner.set_current_chunk(stream, latest);
        }

        self.queue.enable();
        if let Some(handle) = self.queue.spawn_worker(Arc::clone(&self.inner)) {
            *self.worker.lock() = Some(handle);
        }
        *initialized = true;

        info!(
            logs_chunk = self.inner.current_chunk(LogStream::Logs),
            audit_chunk = self.inner.current_chunk(LogStream::Audit),
            "Chunked log store ready"
        );
        Ok(())
    }

    fn write(&self, entry: LogEntry) {
        self.queue.push(entry);
    }

    async fn read_all(&self, stream: LogStream) -> Result<Vec<LogEntry>, StorageError> {
        let numbers = self.inner.chunk_numbers(stream).await?;

        let mut entries = Vec::new();
        let mut skipped = 0;
        for number in numbers {
            skipped += self.inner.read_chunk(stream, number, &mut entries).await;
        }

        if skipped > 0 {
            debug!(%stream, skipped, "Skipped malformed lines");
        }

        Ok(entries)
    }

    async fn clear(&self, stream: LogStream) -> Result<(), StorageError> {
        let _io = self.inner.io_lock.lock().await;

        for number in self.inner.chunk_numbers(stream).await? {
            self.inner.remove_chunk(stream, number).await?;
        }
        self.inner.set_current_chunk(stream, 1);

        info!(%stream, "Cleared chunked stream");
        Ok(())
    }

    async fn size(&self) -> Result<u64, StorageError> {
        let mut total = 0;
        for (stream, number) in self.inner.scan().await? {
            total += self.inner.chunk_len(&self.inner.chunk_path(stream, number)).await?;
        }
        Ok(total)
    }

    async fn flush(&self) {
        self.queue.wait_idle().await;
    }

    async fn close(&self) {
        self.queue.close();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Chunked flush worker panicked");
        }
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    fn dropped(&self) -> u64 {
        self.queue.dropped()
    }
}
