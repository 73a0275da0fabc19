use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use swipe_diag_core::LogLevel;
use swipe_diag_storage::config::DEFAULT_LOG_DIR;
use swipe_diag_storage::{BackendKind, DEFAULT_PAGE_SIZE};
use swipe_diagnostics::ExportFormat;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "swipe-diag", about = "Inspect and export Swipe diagnostic logs")]
pub struct Cli {
    /// Directory holding the log store
    #[arg(long, global = true, default_value = DEFAULT_LOG_DIR)]
    pub dir: PathBuf,

    /// Storage backend the directory was written with (chunked, indexed)
    #[arg(long, global = true, default_value = "chunked")]
    pub backend: BackendKind,

    /// Log level for the tool itself (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List stored entries, newest first
    Query(QueryArgs),
    /// Write an export bundle
    Export(ExportArgs),
    /// Show entry counts, chunk files and size
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete stored entries
    Clear {
        /// Which stream to clear
        #[arg(value_enum)]
        target: ClearTarget,
    },
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Keep only these levels (repeatable or comma-separated)
    #[arg(long = "level", value_delimiter = ',')]
    pub levels: Vec<LogLevel>,
    /// Case-insensitive substring of the event name
    #[arg(long)]
    pub event: Option<String>,
    /// Inclusive lower bound (ISO-8601)
    #[arg(long)]
    pub since: Option<String>,
    /// Inclusive upper bound (ISO-8601)
    #[arg(long)]
    pub until: Option<String>,
    /// Session id
    #[arg(long)]
    pub session: Option<Uuid>,
    /// Correlation id carried in the entry context
    #[arg(long)]
    pub correlation: Option<String>,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub limit: usize,
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
    /// Print entries as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Bundle layout (json, jsonl)
    #[arg(long, default_value = "json")]
    pub format: ExportFormat,
    /// Keep sensitive values in the bundle
    #[arg(long)]
    pub no_redact: bool,
    /// Leave audit entries out of the bundle
    #[arg(long)]
    pub no_audit: bool,
    /// Extra key pattern to redact (regex, repeatable)
    #[arg(long = "redact-key")]
    pub redact_keys: Vec<String>,
    /// Extra value pattern to redact (regex, repeatable)
    #[arg(long = "redact-value")]
    pub redact_values: Vec<String>,
    /// App version recorded in the bundle metadata
    ///
    /// Defaults to the version on the newest stored entry.
    #[arg(long)]
    pub app_version: Option<String>,
    /// Directory to write the bundle into
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    Logs,
    Audit,
    All,
}
