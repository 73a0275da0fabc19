//! End-to-end behaviour of both storage backends

use std::sync::Arc;

use swipe_diag_core::{ContextMap, Device, LogEntry, LogLevel, LogStream, SessionContext, context};
use swipe_diag_storage::{
    BackendKind, ChunkedFileStore, ChunkedStoreConfig, IndexedLogStore, IndexedStoreConfig,
    LogStorage, QueryOptions, RetentionPolicy, StorageConfig, open_backend,
};
use tempfile::TempDir;

fn session() -> SessionContext {
    SessionContext::new("3.1.0", Device::Android)
}

fn padded(i: usize) -> ContextMap {
    context! {
        "index" => i,
        "payload" => "x".repeat(400),
    }
}

#[tokio::test]
async fn test_chunked_rotates_past_default_target_size() {
    let temp_dir = TempDir::new().unwrap();
    let store = ChunkedFileStore::open(temp_dir.path());
    store.init().await.unwrap();
    let session = session();

    // ~600 bytes per line, 1,200 lines is well over one 500 KB chunk
    for round in 0..12 {
        for i in 0..100 {
            store.write(LogEntry::new(LogLevel::Info, "BULK", padded(round * 100 + i), &session));
        }
        store.flush().await;
    }

    let numbers = store.chunk_numbers(LogStream::Logs).await.unwrap();
    assert!(numbers.len() >= 2, "expected rotation, got {numbers:?}");
    assert_eq!(numbers, (1..=numbers.len() as u32).collect::<Vec<_>>());

    // Every closed chunk stays within the target
    for number in &numbers[..numbers.len() - 1] {
        let len = std::fs::metadata(store.chunk_path(LogStream::Logs, *number))
            .unwrap()
            .len();
        assert!(len <= 500 * 1024, "chunk {number} is {len} bytes");
    }

    let entries = store.read_all(LogStream::Logs).await.unwrap();
    assert_eq!(entries.len(), 1_200);
    let indexes: Vec<_> = entries
        .iter()
        .map(|e| e.context["index"].clone())
        .collect();
    assert_eq!(indexes.first(), Some(&0.into()));
    assert_eq!(indexes.last(), Some(&1_199.into()));

    // Audit stream untouched by log rotation
    assert!(store.chunk_numbers(LogStream::Audit).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_chunked_keeps_exactly_max_chunks() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = ChunkedStoreConfig::new(temp_dir.path());
    config.retention = RetentionPolicy::builder().target_chunk_bytes(1_024).build();
    let store = ChunkedFileStore::new(config);
    store.init().await.unwrap();
    let session = session();

    // Two padded entries per flush fill a 1 KB chunk
    for i in 0..30 {
        store.write(LogEntry::new(LogLevel::Audit, format!("AUDIT_{i}"), padded(i), &session));
        store.write(LogEntry::new(LogLevel::Audit, format!("AUDIT_{i}b"), padded(i), &session));
        store.flush().await;
    }

    let numbers = store.chunk_numbers(LogStream::Audit).await.unwrap();
    assert_eq!(numbers.len(), 10);
    assert_eq!(numbers, (21..=30).collect::<Vec<u32>>());

    let events: Vec<_> = store
        .read_all(LogStream::Audit)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event)
        .collect();
    assert_eq!(events.len(), 20);
    assert_eq!(events.first().map(String::as_str), Some("AUDIT_20"));
    assert!(!events.iter().any(|e| e == "AUDIT_19" || e == "AUDIT_0"));
}

#[tokio::test]
async fn test_chunked_reopen_resumes_numbering() {
    let temp_dir = TempDir::new().unwrap();
    let policy = RetentionPolicy::builder().target_chunk_bytes(512).build();
    let session = session();

    {
        let mut config = ChunkedStoreConfig::new(temp_dir.path());
        config.retention = policy;
        let store = ChunkedFileStore::new(config);
        store.init().await.unwrap();
        for i in 0..4 {
            store.write(LogEntry::new(LogLevel::Warn, "SLOW", padded(i), &session));
            store.flush().await;
        }
        assert_eq!(store.current_chunk(LogStream::Logs), 4);
        store.close().await;
    }

    let mut config = ChunkedStoreConfig::new(temp_dir.path());
    config.retention = policy;
    let store = ChunkedFileStore::new(config);
    store.init().await.unwrap();
    assert_eq!(store.current_chunk(LogStream::Logs), 4);

    store.write(LogEntry::new(LogLevel::Warn, "SLOW", padded(4), &session));
    store.flush().await;
    assert_eq!(store.chunk_numbers(LogStream::Logs).await.unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(store.read_all(LogStream::Logs).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_indexed_converges_to_record_caps() {
    let store = IndexedLogStore::in_memory();
    store.init().await.unwrap();
    let session = session();

    // Shared timestamp: insertion order must still decide eviction
    for i in 0..5_100 {
        let ts = "2024-03-01T00:00:00.000Z";
        let entry = LogEntry::at(ts, LogLevel::Debug, format!("E{i}"), ContextMap::new(), &session);
        store.write(entry);
    }
    store.flush().await;

    assert_eq!(store.count(LogStream::Logs).unwrap(), 5_000);
    let logs = store.read_all(LogStream::Logs).await.unwrap();
    assert_eq!(logs.first().unwrap().event, "E100");
    assert_eq!(logs.last().unwrap().event, "E5099");
}

#[tokio::test]
async fn test_indexed_audit_cap_is_independent() {
    let store = IndexedLogStore::new(IndexedStoreConfig {
        retention: RetentionPolicy::builder()
            .max_log_records(5)
            .max_audit_records(8)
            .build(),
        ..Default::default()
    });
    store.init().await.unwrap();
    let session = session();

    for i in 0..20 {
        store.write(LogEntry::new(LogLevel::Info, format!("L{i}"), ContextMap::new(), &session));
        store.write(LogEntry::new(LogLevel::Audit, format!("A{i}"), ContextMap::new(), &session));
    }
    store.flush().await;

    assert_eq!(store.count(LogStream::Logs).unwrap(), 5);
    assert_eq!(store.count(LogStream::Audit).unwrap(), 8);
}

#[tokio::test]
async fn test_query_orders_newest_first_on_both_backends() {
    let temp_dir = TempDir::new().unwrap();
    let config = StorageConfig::with_data_dir(temp_dir.path());
    let session = session();

    for kind in [BackendKind::Indexed, BackendKind::ChunkedFile] {
        let store: Arc<dyn LogStorage> = open_backend(&config, kind);
        store.init().await.unwrap();

        for (ts, level, event) in [
            ("2024-05-01T10:00:01.000Z", LogLevel::Info, "T1"),
            ("2024-05-01T10:00:02.000Z", LogLevel::Audit, "T2"),
            ("2024-05-01T10:00:03.000Z", LogLevel::Error, "T3"),
        ] {
            store.write(LogEntry::at(ts, level, event, ContextMap::new(), &session));
        }
        store.flush().await;

        let page = store.query(&QueryOptions::new()).await.unwrap();
        let events: Vec<_> = page.entries.iter().map(|e| e.event.as_str()).collect();
        assert_eq!(events, vec!["T3", "T2", "T1"], "backend {kind}");

        let page = store.query(&QueryOptions::new().page(2, 0)).await.unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.total, 3);
        assert!(page.has_more);

        let page = store.query(&QueryOptions::new().page(2, 2)).await.unwrap();
        assert_eq!(page.entries.len(), 1);
        assert!(!page.has_more);

        store.clear(LogStream::Logs).await.unwrap();
        store.clear(LogStream::Audit).await.unwrap();
        assert_eq!(store.query(&QueryOptions::new()).await.unwrap().total, 0);
        store.close().await;
    }
}

#[tokio::test]
async fn test_full_queue_drops_oldest_before_init() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = ChunkedStoreConfig::new(temp_dir.path());
    config.queue_capacity = 10;
    let store = ChunkedFileStore::new(config);
    let session = session();

    for i in 0..15 {
        store.write(LogEntry::new(LogLevel::Info, format!("E{i}"), ContextMap::new(), &session));
    }
    assert_eq!(store.pending(), 10);
    assert_eq!(store.dropped(), 5);

    store.init().await.unwrap();
    store.flush().await;

    let events: Vec<_> = store
        .read_all(LogStream::Logs)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.event)
        .collect();
    assert_eq!(events.first().map(String::as_str), Some("E5"));
    assert_eq!(events.len(), 10);
}
