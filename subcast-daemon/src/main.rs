//! Subcast Daemon - translation result exporter
//!
//! Reads translation results (JSON lines) from stdin and fans each one out to
//! the configured output file, HTTP sinks and live WebSocket viewers.
//! Results are echoed to stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use subcast_daemon::config::Cli;
use subcast_daemon::ingest::forward_json_lines;
use subcast_daemon::ResultDispatcher;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    info!("Starting Subcast Daemon v{}", env!("CARGO_PKG_VERSION"));

    let config = Cli::parse()
        .into_config()
        .context("Failed to load configuration")?;

    match &config.config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("Using default configuration"),
    }

    let destinations = config.enabled_destinations();
    if destinations.is_empty() {
        warn!("No destinations enabled; results will only be printed");
    } else {
        info!("Destinations: {}", destinations.join(", "));
    }

    let dispatcher = ResultDispatcher::start(&config)
        .await
        .context("Failed to initialize exporter")?;

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        match forward_json_lines(BufReader::new(tokio::io::stdin()), tx).await {
            Ok(count) => info!("Input ended after {} results", count),
            Err(e) => error!("Failed to read input: {}", e),
        }
    });

    info!("Subcast daemon ready");

    tokio::select! {
        _ = dispatcher.run(rx) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Subcast daemon stopped");
    Ok(())
}
