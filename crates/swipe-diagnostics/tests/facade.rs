//! Logger facade and diagnostics context behaviour

use std::sync::Arc;

use swipe_diag_core::{
    CORRELATION_ID_KEY, HostCapabilities, LogLevel, LogStream, SessionContext, context,
};
use swipe_diag_storage::{BackendKind, ChunkedFileStore, LogStorage, QueryOptions};
use swipe_diagnostics::{Diagnostics, DiagnosticsConfig, ExportOptions};
use tempfile::TempDir;

#[tokio::test]
async fn test_threshold_persists_exactly_one_entry_per_kept_call() {
    for min_level in LogLevel::ALL {
        let temp_dir = TempDir::new().unwrap();
        let config = DiagnosticsConfig::testing(temp_dir.path()).with_min_level(min_level);
        let diagnostics = Diagnostics::new(config, HostCapabilities::ios());
        diagnostics.init().await;

        let log = diagnostics.logger();
        for level in LogLevel::ALL {
            log.log(level, format!("EVENT_{level}"), context! {});
        }
        diagnostics.flush().await;

        let page = diagnostics.query(&QueryOptions::new()).await.unwrap();
        for level in LogLevel::ALL {
            let persisted = page.entries.iter().filter(|e| e.level == level).count();
            let expected = usize::from(level >= min_level || level == LogLevel::Audit);
            assert_eq!(persisted, expected, "min={min_level} level={level}");
        }
        diagnostics.shutdown().await;
    }
}

#[tokio::test]
async fn test_audit_survives_strictest_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let config = DiagnosticsConfig::production(temp_dir.path()).with_min_level(LogLevel::Audit);
    let diagnostics = Diagnostics::new(config, HostCapabilities::android());
    diagnostics.init().await;

    let log = diagnostics.logger();
    log.error("CRASH", context! { "code" => 7 });
    log.audit("ACCOUNT_DELETED", context! { "userId" => "u-1" });
    diagnostics.flush().await;

    assert!(diagnostics.read_all(LogStream::Logs).await.unwrap().is_empty());
    let audit = diagnostics.read_all(LogStream::Audit).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event, "ACCOUNT_DELETED");
}

#[tokio::test]
async fn test_backend_follows_host_capabilities() {
    let temp_dir = TempDir::new().unwrap();

    let native = Diagnostics::new(
        DiagnosticsConfig::testing(temp_dir.path()),
        HostCapabilities::android(),
    );
    assert_eq!(native.backend(), BackendKind::ChunkedFile);

    let web = Diagnostics::new(DiagnosticsConfig::development(), HostCapabilities::web());
    assert_eq!(web.backend(), BackendKind::Indexed);
    assert_eq!(web.session().device().as_str(), "web");
}

#[tokio::test]
async fn test_init_failure_turns_writes_into_noops() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("not-a-dir");
    std::fs::write(&blocker, "plain file").unwrap();

    let config = DiagnosticsConfig::testing(blocker.join("logs"));
    let diagnostics = Diagnostics::new(config, HostCapabilities::android());
    diagnostics.init().await;

    let log = diagnostics.logger();
    log.error("AFTER_FAILED_INIT", None);
    log.audit("AFTER_FAILED_INIT", context! {});
    diagnostics.flush().await;

    assert_eq!(diagnostics.storage().pending(), 0);
    assert!(diagnostics.read_all(LogStream::Logs).await.unwrap().is_empty());
    assert!(diagnostics.export(&ExportOptions::default()).await.is_ok());
}

#[tokio::test]
async fn test_correlation_and_session_filters() {
    let temp_dir = TempDir::new().unwrap();
    let config = DiagnosticsConfig::testing(temp_dir.path());
    let diagnostics = Diagnostics::new(config, HostCapabilities::android());
    diagnostics.init().await;

    let log = diagnostics.logger();
    log.info("CHECKOUT_START", context! { CORRELATION_ID_KEY => "op-7" });
    log.warn("CHECKOUT_SLOW", context! { CORRELATION_ID_KEY => "op-7", "ms" => 2300 });
    log.info("CHECKOUT_START", context! { CORRELATION_ID_KEY => "op-8" });
    log.audit("PAYMENT_AUTHORIZED", context! { CORRELATION_ID_KEY => "op-7" });
    diagnostics.flush().await;

    let page = diagnostics
        .query(&QueryOptions::new().with_correlation_id("op-7"))
        .await
        .unwrap();
    assert_eq!(page.total, 3);

    let page = diagnostics
        .query(
            &QueryOptions::new()
                .with_session(diagnostics.session().session_id())
                .with_event("checkout")
                .with_levels([LogLevel::Info]),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn test_injected_storage_is_shared_with_logger() {
    let temp_dir = TempDir::new().unwrap();
    let storage: Arc<dyn LogStorage> = Arc::new(ChunkedFileStore::open(temp_dir.path()));
    let session = SessionContext::for_host("9.9.9", &HostCapabilities::ios());
    let diagnostics = Diagnostics::with_storage(
        DiagnosticsConfig::testing(temp_dir.path()),
        session,
        Arc::clone(&storage),
    );
    diagnostics.init().await;

    diagnostics.logger().info("VIA_FACADE", None);
    storage.flush().await;

    let logs = storage.read_all(LogStream::Logs).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].app_version, "9.9.9");
    assert!(diagnostics.size().await.unwrap() > 0);

    diagnostics.clear(LogStream::Logs).await.unwrap();
    assert_eq!(diagnostics.size().await.unwrap(), 0);
}
