//! Bounded write queue drained by a single flush worker
//!
//! Callers never wait on the medium: `push` appends to an in-memory queue
//! and wakes the worker. Exactly one worker per backend drains the queue in
//! batches and hands them to a [`BatchSink`], so writes to a stream are
//! serialized. When the queue is full the oldest queued entry is dropped.

use std::collections::VecDeque;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use swipe_diag_core::LogEntry;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::StorageError;

/// Default number of entries held in memory before dropping the oldest
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
/// Default number of entries handed to the sink per flush
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Destination of drained batches
#[async_trait]
pub trait BatchSink: Send + Sync + 'static {
    /// Persist a batch in order
    ///
    /// Errors are logged by the worker and the batch is discarded.
    async fn write_batch(&self, batch: Vec<LogEntry>) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<LogEntry>,
    /// A batch has been taken and is being written
    in_flight: bool,
    /// Writes are discarded (backend failed to initialize)
    disabled: bool,
    /// Worker should exit once drained
    closed: bool,
}

/// Bounded in-memory queue with drop-oldest backpressure
#[derive(Debug)]
pub struct WriteQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    batch_size: usize,
    dropped: AtomicU64,
    worker_started: AtomicBool,
    wake: Notify,
    idle: Notify,
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, DEFAULT_BATCH_SIZE)
    }
}

impl WriteQueue {
    /// Create a queue; zero capacity or batch size is raised to one
    pub fn new(capacity: usize, batch_size: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            capacity: capacity.max(1),
            batch_size: batch_size.max(1),
            dropped: AtomicU64::new(0),
            worker_started: AtomicBool::new(false),
            wake: Notify::new(),
            idle: Notify::new(),
        }
    }

    /// Enqueue an entry without waiting
    pub fn push(&self, entry: LogEntry) {
        {
            let mut state = self.state.lock();
            if state.disabled || state.closed {
                return;
            }

            if state.entries.len() >= self.capacity {
                state.entries.pop_front();
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped % 1_000 == 0 {
                    warn!(
                        dropped,
                        capacity = self.capacity,
                        "Write queue full, dropping oldest entries"
                    );
                }
            }

            state.entries.push_back(entry);
        }

        self.wake.notify_one();
    }

    /// Number of entries waiting to be written
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total entries dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Discard queued entries and ignore further writes
    pub fn disable(&self) {
        {
            let mut state = self.state.lock();
            state.disabled = true;
            state.entries.clear();
        }
        self.idle.notify_waiters();
    }

    /// Accept writes again after a successful (re)initialization
    pub fn enable(&self) {
        self.state.lock().disabled = false;
    }

    pub fn is_disabled(&self) -> bool {
        self.state.lock().disabled
    }

    /// Ask the worker to drain what is queued and exit
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.wake.notify_one();
    }

    /// Whether nothing is queued and nothing is being written
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.entries.is_empty() && !state.in_flight
    }

    /// Spawn the flush worker on the current tokio runtime
    ///
    /// Only the first call spawns; later calls return `None`.
    pub fn spawn_worker<S: BatchSink>(self: &Arc<Self>, sink: Arc<S>) -> Option<JoinHandle<()>> {
        if self.worker_started.swap(true, Ordering::SeqCst) {
            return None;
        }

        let queue = Arc::clone(self);
        Some(tokio::spawn(async move {
            queue.run(sink).await;
        }))
    }

    /// Wait until every entry queued so far has been handed to the sink
    ///
    /// Returns immediately if no worker was ever started.
    pub async fn wait_idle(&self) {
        if !self.worker_started.load(Ordering::SeqCst) {
            return;
        }

        loop {
            let mut notified = pin!(self.idle.notified());
            notified.as_mut().enable();

            if self.is_idle() {
                return;
            }

            notified.await;
        }
    }

    fn next_batch(&self) -> Option<Vec<LogEntry>> {
        let mut state = self.state.lock();
        if state.entries.is_empty() {
            state.in_flight = false;
            return None;
        }

        state.in_flight = true;
        let take = self.batch_size.min(state.entries.len());
        Some(state.entries.drain(..take).collect())
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    async fn run<S: BatchSink>(self: Arc<Self>, sink: Arc<S>) {
        debug!(
            capacity = self.capacity,
            batch_size = self.batch_size,
            "Flush worker started"
        );

        loop {
            match self.next_batch() {
                Some(batch) => {
                    let count = batch.len();
                    if let Err(e) = sink.write_batch(batch).await {
                        warn!(error = %e, count, "Failed to persist log batch, dropping it");
                    }
                }
                None => {
                    self.idle.notify_waiters();
                    if self.is_closed() {
                        break;
                    }
                    self.wake.notified().await;
                }
            }
        }

        debug!("Flush worker stopped");
    }
}
