//! Terminal viewer for the Subcast broadcast stream
//!
//! Connects to the daemon's WebSocket server and prints every result it
//! pushes. Reconnects automatically when the daemon goes away.

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use subcast_broadcaster::{render_message, BroadcasterError, ViewerClient};

#[derive(Debug, Parser)]
#[command(
    name = "subcast-viewer",
    version,
    about = "Print live results from a Subcast daemon"
)]
struct Args {
    /// Broadcast server URL
    #[arg(default_value = "ws://localhost:8765")]
    url: String,

    /// Seconds to wait before reconnecting
    #[arg(long, default_value_t = 2)]
    retry_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    tokio::select! {
        _ = watch(&args) => {}
        _ = tokio::signal::ctrl_c() => info!("Closing viewer"),
    }
    Ok(())
}

async fn watch(args: &Args) {
    loop {
        match ViewerClient::connect(&args.url).await {
            Ok(mut client) => {
                info!("Connected to {}, waiting for messages", args.url);
                while let Some(message) = client.next_message().await {
                    match message {
                        Ok(message) => {
                            println!("{}\n-------------------\n", render_message(&message));
                        }
                        Err(BroadcasterError::InvalidMessage { payload, source }) => {
                            warn!("Failed to parse message: {}. Raw data: {}", source, payload);
                        }
                        Err(e) => {
                            warn!("Connection error: {}", e);
                            break;
                        }
                    }
                }
                warn!("Disconnected from {}", args.url);
            }
            Err(e) => warn!("Failed to connect to {}: {}. Retrying...", args.url, e),
        }
        tokio::time::sleep(Duration::from_secs(args.retry_secs)).await;
    }
}
