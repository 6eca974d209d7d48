//! faultmon - Main Entry Point

use std::path::PathBuf;

use clap::Parser;
use monitor::{init_logging, run, shutdown_signal, Settings};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Watches a management endpoint for threshold-crossed faults and notifies
/// once per raise and once per recovery
#[derive(Debug, Parser)]
#[command(name = "faultmon", version)]
struct Cli {
    /// Settings file (TOML); FAULTMON_* environment variables override it
    #[arg(short, long, default_value = "faultmon.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;
    init_logging(&settings.logging)?;

    info!("=== faultmon v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Settings loaded from {}", cli.config.display());

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    run(settings, shutdown).await
}
