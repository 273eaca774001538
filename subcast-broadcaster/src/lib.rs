//! Live broadcast of translation results to WebSocket viewers
//!
//! This crate provides a WebSocket server that pushes every translation
//! result the exporter handles to all currently connected viewers. Viewers
//! only listen; anything they send is ignored apart from close frames.
//!
//! # Features
//!
//! - WebSocket server on a configurable host/port (default `localhost:8765`)
//! - One JSON text frame per result
//! - Multiple concurrent viewers, each with its own bounded send queue
//! - Lock-sharded membership set shared between the server and the dispatcher
//! - No history: viewers joining late only see later results
//! - [`ViewerClient`] for consuming the stream from Rust
//!
//! # Message Shape
//!
//! ```json
//! {"timestamp": "0:00:05,000 --> 0:00:07,250",
//!  "transcribed_text": null,
//!  "translated_text": "Hello",
//!  "time_range": [5.0, 7.25]}
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use subcast_broadcaster::{BroadcastChannel, BroadcastServer, OutgoingMessage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let channel = BroadcastChannel::new();
//!
//!     // Bind fails fast if the port is taken
//!     let server = BroadcastServer::bind("localhost:8765", channel.clone()).await?;
//!     server.spawn();
//!
//!     channel.broadcast(&OutgoingMessage {
//!         timestamp: None,
//!         transcribed_text: None,
//!         translated_text: Some("Hello".to_string()),
//!         time_range: (5.0, 7.25),
//!     })?;
//!
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod client;
pub mod error;
pub mod events;
pub mod server;

// Re-exports
pub use channel::{BroadcastChannel, Registration, ViewerId, ViewerInbox, DEFAULT_VIEWER_BUFFER};
pub use client::{render_message, ViewerClient};
pub use error::{BroadcasterError, Result};
pub use events::OutgoingMessage;
pub use server::BroadcastServer;
