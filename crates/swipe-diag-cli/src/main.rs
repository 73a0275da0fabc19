use std::io::Write;

use clap::Parser;
use swipe_diag_cli::commands;
use swipe_diag_cli::config::{Cli, Command};
use swipe_diag_cli::Store;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = Store::open(&cli.dir, cli.backend).await?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = match &cli.command {
        Command::Query(args) => commands::query(&store, args, &mut out).await,
        Command::Export(args) => commands::export(&store, args, &mut out).await.map(|_| ()),
        Command::Stats { json } => commands::stats(&store, *json, &mut out).await,
        Command::Clear { target } => commands::clear(&store, *target, &mut out).await,
    };

    out.flush()?;
    store.close().await;
    result
}
