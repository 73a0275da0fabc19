//! Subcommand implementations
//!
//! Every command writes its report to the given writer so the binary can
//! hand it stdout and tests can hand it a buffer.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use swipe_diag_core::{HostCapabilities, LogEntry, LogStream, SessionContext};
use swipe_diag_storage::{
    BackendKind, ChunkedFileStore, LogStorage, QueryOptions, StorageConfig, open_backend,
};
use swipe_diagnostics::{Diagnostics, DiagnosticsConfig, ExportOptions, Redactor};
use tracing::{debug, info};

use crate::config::{ClearTarget, ExportArgs, QueryArgs};

/// An opened log store
pub struct Store {
    dir: PathBuf,
    kind: BackendKind,
    storage: Arc<dyn LogStorage>,
}

impl Store {
    /// Open and initialize the store under `dir`
    pub async fn open(dir: impl Into<PathBuf>, kind: BackendKind) -> anyhow::Result<Self> {
        let dir = dir.into();
        let mut config = StorageConfig::with_data_dir(&dir);
        config.backend = Some(kind);

        let storage = open_backend(&config, kind);
        storage
            .init()
            .await
            .with_context(|| format!("Failed to open {kind} store at {}", dir.display()))?;

        debug!(dir = ?dir, backend = %kind, "Opened store");
        Ok(Self { dir, kind, storage })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn storage(&self) -> &Arc<dyn LogStorage> {
        &self.storage
    }

    /// Flush and release the backend
    pub async fn close(self) {
        self.storage.close().await;
    }
}

/// One human-readable line per entry
pub fn format_entry(entry: &LogEntry) -> String {
    let mut line = format!(
        "{} {:<5} {}",
        entry.timestamp,
        entry.level.as_str().to_uppercase(),
        entry.event
    );
    if !entry.context.is_empty() {
        let context = serde_json::to_string(&entry.context).unwrap_or_default();
        line.push(' ');
        line.push_str(&context);
    }
    line
}

pub async fn query(store: &Store, args: &QueryArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut options = QueryOptions::new().page(args.limit, args.offset);
    if !args.levels.is_empty() {
        options = options.with_levels(args.levels.iter().copied());
    }
    if let Some(event) = &args.event {
        options = options.with_event(event.clone());
    }
    if let Some(since) = &args.since {
        options = options.since(since.clone());
    }
    if let Some(until) = &args.until {
        options = options.until(until.clone());
    }
    if let Some(session) = args.session {
        options = options.with_session(session);
    }
    if let Some(correlation) = &args.correlation {
        options = options.with_correlation_id(correlation.clone());
    }

    let page = store.storage.query(&options).await?;

    for entry in &page.entries {
        if args.json {
            writeln!(out, "{}", entry.to_json_line()?)?;
        } else {
            writeln!(out, "{}", format_entry(entry))?;
        }
    }

    if !args.json {
        writeln!(
            out,
            "-- {} of {} entries{}",
            page.entries.len(),
            page.total,
            if page.has_more { ", more available" } else { "" }
        )?;
    }
    Ok(())
}

/// Session the stored logs were written under
///
/// Metadata comes from the newest stored entry so the bundle describes the
/// device that produced the logs. An empty store falls back to this host.
pub async fn source_session(
    store: &Store,
    app_version: Option<&str>,
) -> anyhow::Result<SessionContext> {
    let newest = store
        .storage
        .query(&QueryOptions::new().page(1, 0))
        .await?
        .entries
        .into_iter()
        .next();

    let session = match newest {
        Some(entry) => SessionContext::with_session_id(
            entry.session_id,
            app_version.map_or(entry.app_version, str::to_string),
            entry.device,
        ),
        None => SessionContext::for_host(
            app_version.unwrap_or(env!("CARGO_PKG_VERSION")),
            &HostCapabilities::detect(),
        ),
    };
    Ok(session)
}

/// Build the bundle and write it into `args.out`, returning its path
pub async fn export(
    store: &Store,
    args: &ExportArgs,
    out: &mut dyn Write,
) -> anyhow::Result<PathBuf> {
    let session = source_session(store, args.app_version.as_deref()).await?;
    let config = DiagnosticsConfig::production(&store.dir)
        .with_app_version(session.app_version())
        .with_backend(store.kind);
    let redactor = Redactor::with_additional(&args.redact_keys, &args.redact_values)?;

    let diagnostics = Diagnostics::with_storage(config, session, Arc::clone(&store.storage))
        .with_redactor(redactor);

    let options = ExportOptions::new(args.format)
        .with_redaction(!args.no_redact)
        .with_audit(!args.no_audit);
    let artifact = diagnostics.export(&options).await?;
    let path = artifact.write_to(&args.out).await?;

    writeln!(
        out,
        "{} ({} logs, {} audit, {})",
        path.display(),
        artifact.metadata.log_count,
        artifact.metadata.audit_count,
        if artifact.metadata.redacted { "redacted" } else { "NOT redacted" }
    )?;
    Ok(path)
}

pub async fn stats(store: &Store, json: bool, out: &mut dyn Write) -> anyhow::Result<()> {
    // Reads only, so a second handle on the same directory is safe
    let chunks = match store.kind {
        BackendKind::ChunkedFile => Some(ChunkedFileStore::open(&store.dir)),
        BackendKind::Indexed => None,
    };

    let mut streams = serde_json::Map::new();
    for stream in LogStream::ALL {
        let entries = store.storage.read_all(stream).await?.len();
        let chunk_numbers = match &chunks {
            Some(chunked) => Some(chunked.chunk_numbers(stream).await?),
            None => None,
        };
        streams.insert(
            stream.file_prefix().to_string(),
            json!({ "entries": entries, "chunks": chunk_numbers }),
        );
    }
    let size = store.storage.size().await?;

    let report = json!({
        "backend": store.kind.as_str(),
        "dir": store.dir.display().to_string(),
        "sizeBytes": size,
        "streams": streams,
    });

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    writeln!(out, "backend: {}", store.kind)?;
    writeln!(out, "dir:     {}", store.dir.display())?;
    writeln!(out, "size:    {size} bytes")?;
    for (name, stream) in &streams {
        write!(out, "{name:<7}: {} entries", stream["entries"])?;
        if let Some(numbers) = stream["chunks"].as_array() {
            let numbers: Vec<String> = numbers.iter().map(|n| n.to_string()).collect();
            write!(out, " in {} chunks [{}]", numbers.len(), numbers.join(", "))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub async fn clear(store: &Store, target: ClearTarget, out: &mut dyn Write) -> anyhow::Result<()> {
    let streams: &[LogStream] = match target {
        ClearTarget::Logs => &[LogStream::Logs],
        ClearTarget::Audit => &[LogStream::Audit],
        ClearTarget::All => &LogStream::ALL,
    };

    for &stream in streams {
        store.storage.clear(stream).await?;
        info!(stream = %stream, dir = ?store.dir, "Cleared stream");
        writeln!(out, "cleared {stream}")?;
    }
    Ok(())
}
