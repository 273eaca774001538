//! Result fan-out loop
//!
//! Input queue → format → {file, HTTP sinks} → broadcast to viewers.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use subcast_broadcaster::{BroadcastChannel, BroadcastServer, OutgoingMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::OutputConfig;
use crate::result::TranslationResult;
use crate::sinks::SinkSet;

/// Everything derived from one result before it is sent anywhere
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedResult {
    /// Text for the file and HTTP sinks
    pub text: String,

    /// Console line; `None` when there is no translation
    pub display: Option<String>,

    /// Broadcast payload
    pub message: OutgoingMessage,
}

/// Pulls results off the input queue and fans each one out
pub struct ResultDispatcher {
    output_transcribed_text: bool,
    output_timestamps: bool,
    sinks: SinkSet,
    channel: Option<BroadcastChannel>,
    broadcast_addr: Option<SocketAddr>,
}

impl ResultDispatcher {
    pub fn new(config: &OutputConfig, sinks: SinkSet, channel: Option<BroadcastChannel>) -> Self {
        Self {
            output_transcribed_text: config.output_transcribed_text,
            output_timestamps: config.output_timestamps,
            sinks,
            channel,
            broadcast_addr: None,
        }
    }

    /// Build sinks, clear the output file and start the broadcast server
    ///
    /// Any failure here is fatal, in particular a broadcast port that cannot
    /// be bound.
    pub async fn start(config: &OutputConfig) -> Result<Self> {
        let sinks = SinkSet::from_config(config).context("Failed to configure output sinks")?;
        sinks
            .prepare()
            .await
            .context("Failed to prepare output file")?;

        let (channel, broadcast_addr) = if config.broadcast.enabled {
            let channel = BroadcastChannel::with_viewer_buffer(config.broadcast.viewer_buffer);
            let server = BroadcastServer::bind(&config.broadcast.bind_addr(), channel.clone())
                .await
                .context("Failed to start broadcast server")?;
            let addr = server.local_addr();
            server.spawn();
            (Some(channel), Some(addr))
        } else {
            info!("Broadcast server disabled");
            (None, None)
        };

        let mut dispatcher = Self::new(config, sinks, channel);
        dispatcher.broadcast_addr = broadcast_addr;
        Ok(dispatcher)
    }

    /// Address the broadcast server is listening on, if it was started
    pub fn broadcast_addr(&self) -> Option<SocketAddr> {
        self.broadcast_addr
    }

    pub fn channel(&self) -> Option<&BroadcastChannel> {
        self.channel.as_ref()
    }

    pub fn sinks(&self) -> &SinkSet {
        &self.sinks
    }

    /// Process results until every producer has gone away
    pub async fn run(&self, mut input: mpsc::UnboundedReceiver<TranslationResult>) {
        info!("Dispatcher waiting for results");
        while let Some(result) = input.recv().await {
            self.dispatch(result).await;
        }
        info!("Input queue closed, dispatcher stopping");
    }

    /// Deliver one result to every enabled destination
    pub async fn dispatch(&self, result: TranslationResult) {
        let formatted = self.format(&result);

        if let Some(display) = &formatted.display {
            println!("\x1b[1m{}\x1b[0m", display);
        }

        let delivered = self.sinks.deliver(&formatted.text).await;
        debug!("Result delivered to {}/{} sinks", delivered, self.sinks.len());

        if let Some(channel) = &self.channel {
            match channel.broadcast(&formatted.message) {
                Ok(viewers) => debug!("Result broadcast to {} viewers", viewers),
                Err(e) => warn!("Failed to broadcast result: {}", e),
            }
        }
    }

    /// Build the sink text, console line and broadcast payload for `result`
    pub fn format(&self, result: &TranslationResult) -> FormattedResult {
        let timestamp_text = result.timestamp_text();

        let mut text = String::new();
        if self.output_timestamps {
            text.push_str(&timestamp_text);
            text.push('\n');
        }
        if self.output_transcribed_text {
            text.push_str(result.transcribed_text.as_deref().unwrap_or_default());
            text.push('\n');
        }

        let display = match result.translated_text.as_deref() {
            Some(translated) if !translated.is_empty() => {
                text.push_str(translated);
                let line = if self.output_timestamps {
                    format!("{} {}", timestamp_text, translated)
                } else {
                    translated.to_string()
                };
                Some(line.trim().to_string())
            }
            _ => None,
        };

        let message = OutgoingMessage {
            timestamp: self.output_timestamps.then(|| timestamp_text.clone()),
            transcribed_text: if self.output_transcribed_text {
                result.transcribed_text.clone()
            } else {
                None
            },
            translated_text: result.translated_text.clone(),
            time_range: result.time_range,
        };

        FormattedResult {
            text: text.trim().to_string(),
            display,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher(timestamps: bool, transcribed: bool) -> ResultDispatcher {
        let mut config = OutputConfig::default();
        config.output_timestamps = timestamps;
        config.output_transcribed_text = transcribed;
        ResultDispatcher::new(&config, SinkSet::default(), None)
    }

    fn sample() -> TranslationResult {
        TranslationResult::new(
            (5.0, 7.25),
            Some("Bonjour le monde".into()),
            Some("Hello world".into()),
        )
    }

    #[test]
    fn test_translation_only() {
        let formatted = dispatcher(false, false).format(&sample());

        assert_eq!(formatted.text, "Hello world");
        assert_eq!(formatted.display.as_deref(), Some("Hello world"));
        assert_eq!(formatted.message.timestamp, None);
        assert_eq!(formatted.message.transcribed_text, None);
        assert_eq!(formatted.message.translated_text.as_deref(), Some("Hello world"));
        assert_eq!(formatted.message.time_range, (5.0, 7.25));
    }

    #[test]
    fn test_timestamps_and_transcription() {
        let formatted = dispatcher(true, true).format(&sample());

        assert_eq!(
            formatted.text,
            "0:00:05,000 --> 0:00:07,250\nBonjour le monde\nHello world"
        );
        assert_eq!(
            formatted.display.as_deref(),
            Some("0:00:05,000 --> 0:00:07,250 Hello world")
        );
        assert_eq!(
            formatted.message.timestamp.as_deref(),
            Some("0:00:05,000 --> 0:00:07,250")
        );
        assert_eq!(
            formatted.message.transcribed_text.as_deref(),
            Some("Bonjour le monde")
        );
    }

    #[test]
    fn test_timestamps_disabled_leaves_no_trace() {
        let formatted = dispatcher(false, true).format(&sample());

        assert_eq!(formatted.text, "Bonjour le monde\nHello world");
        assert!(!formatted.text.contains("-->"));
        assert_eq!(formatted.message.timestamp, None);
    }

    #[test]
    fn test_missing_translation() {
        let result = TranslationResult::new((1.0, 2.0), Some("  untranslated ".into()), None);
        let formatted = dispatcher(true, true).format(&result);

        assert_eq!(formatted.display, None);
        assert_eq!(formatted.text, "0:00:01,000 --> 0:00:02,000\n  untranslated");
        assert_eq!(formatted.message.translated_text, None);
    }

    #[test]
    fn test_missing_transcription_with_output_enabled() {
        let result = TranslationResult::new((1.0, 2.0), None, Some("Hi".into()));
        let formatted = dispatcher(false, true).format(&result);

        assert_eq!(formatted.text, "Hi");
        assert_eq!(formatted.message.transcribed_text, None);
    }

    #[test]
    fn test_text_is_trimmed() {
        let result = TranslationResult::new((0.0, 1.0), None, Some("  padded \n".into()));
        let formatted = dispatcher(false, false).format(&result);

        assert_eq!(formatted.text, "padded");
        assert_eq!(formatted.display.as_deref(), Some("padded"));
        // Broadcast carries the raw translation
        assert_eq!(formatted.message.translated_text.as_deref(), Some("  padded \n"));
    }

    #[tokio::test]
    async fn test_run_stops_when_input_closes() {
        let dispatcher = dispatcher(false, false);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(sample()).unwrap();
        drop(tx);

        tokio::time::timeout(std::time::Duration::from_secs(1), dispatcher.run(rx))
            .await
            .unwrap();
    }
}
