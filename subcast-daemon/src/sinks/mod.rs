//! Output destinations for formatted result text
//!
//! Each sink turns the same text into its destination's wire format. Sinks
//! hold no state between deliveries beyond their connection parameters, and
//! a failure in one never affects another: [`SinkSet::deliver`] logs and
//! swallows every error.

mod callback;
mod chat_webhook;
mod file;
mod messaging_bot;

pub use callback::CallbackSink;
pub use chat_webhook::ChatWebhookSink;
pub use file::FileSink;
pub use messaging_bot::MessagingBotSink;

use std::time::Duration;
use thiserror::Error;

use crate::config::{non_empty, OutputConfig};

/// Timeout applied to every outbound HTTP request
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid proxy {proxy:?}: {source}")]
    Proxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{failed} of {total} messages failed")]
    PartialDelivery { failed: usize, total: usize },
}

/// Build the HTTP client shared by all network sinks
///
/// `proxy` may be `host:port` (treated as an HTTP proxy) or a full URL; it is
/// used for both http and https targets.
pub fn build_http_client(proxy: Option<&str>) -> Result<reqwest::Client, SinkError> {
    let mut builder = reqwest::Client::builder().timeout(HTTP_TIMEOUT);

    if let Some(proxy) = proxy.map(str::trim).filter(|p| !p.is_empty()) {
        let proxy_url = if proxy.contains("://") {
            proxy.to_string()
        } else {
            format!("http://{}", proxy)
        };
        let proxy = reqwest::Proxy::all(&proxy_url).map_err(|source| SinkError::Proxy {
            proxy: proxy_url.clone(),
            source,
        })?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

/// One configured destination
#[derive(Debug, Clone)]
pub enum Sink {
    File(FileSink),
    Callback(CallbackSink),
    ChatWebhook(ChatWebhookSink),
    MessagingBot(MessagingBotSink),
}

impl Sink {
    pub fn name(&self) -> &'static str {
        match self {
            Sink::File(_) => "file",
            Sink::Callback(_) => "callback",
            Sink::ChatWebhook(_) => "chat-webhook",
            Sink::MessagingBot(_) => "messaging-bot",
        }
    }

    pub async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        match self {
            Sink::File(sink) => sink.deliver(text).await,
            Sink::Callback(sink) => sink.deliver(text).await,
            Sink::ChatWebhook(sink) => sink.deliver(text).await,
            Sink::MessagingBot(sink) => sink.deliver(text).await,
        }
    }
}

/// The destinations enabled by an [`OutputConfig`]
#[derive(Debug, Clone, Default)]
pub struct SinkSet {
    sinks: Vec<Sink>,
}

impl SinkSet {
    pub fn new(sinks: Vec<Sink>) -> Self {
        Self { sinks }
    }

    /// Build every sink whose connection parameters are present
    pub fn from_config(config: &OutputConfig) -> Result<Self, SinkError> {
        let mut sinks = Vec::new();

        if let Some(path) = &config.output_file {
            sinks.push(Sink::File(FileSink::new(path)));
        }

        let wants_http = non_empty(&config.callback.url).is_some()
            || non_empty(&config.chat_webhook.url).is_some()
            || non_empty(&config.messaging_bot.token).is_some();
        if !wants_http {
            return Ok(Self { sinks });
        }

        let client = build_http_client(config.proxy.as_deref())?;

        if let Some(url) = non_empty(&config.callback.url) {
            sinks.push(Sink::Callback(CallbackSink::new(
                client.clone(),
                url,
                non_empty(&config.callback.token),
            )));
        }
        if let Some(url) = non_empty(&config.chat_webhook.url) {
            sinks.push(Sink::ChatWebhook(ChatWebhookSink::new(client.clone(), url)));
        }
        if let (Some(token), Some(chat_id)) = (
            non_empty(&config.messaging_bot.token),
            non_empty(&config.messaging_bot.chat_id),
        ) {
            sinks.push(Sink::MessagingBot(MessagingBotSink::new(
                client,
                &config.messaging_bot.api_base,
                token,
                chat_id,
            )));
        }

        Ok(Self { sinks })
    }

    /// One-time startup work; currently clears a stale output file
    pub async fn prepare(&self) -> Result<(), SinkError> {
        for sink in &self.sinks {
            if let Sink::File(file) = sink {
                file.prepare().await?;
            }
        }
        Ok(())
    }

    /// Deliver `text` to every sink in turn
    ///
    /// Errors are logged and otherwise ignored. Returns the number of sinks
    /// that reported success.
    pub async fn deliver(&self, text: &str) -> usize {
        let mut delivered = 0;
        for sink in &self.sinks {
            match sink.deliver(text).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!("Failed to deliver to {} sink: {}", sink.name(), e),
            }
        }
        delivered
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(Sink::name).collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}
