//! Configuration management

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Generic HTTP callback (e.g. a go-cqhttp style bot bridge)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    /// POST target; sink is disabled when unset
    pub url: Option<String>,

    /// Sent as `Authorization: Bearer <token>` when set
    pub token: Option<String>,
}

/// Chat webhook (Discord style `{"content": ...}` payloads)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatWebhookConfig {
    pub url: Option<String>,
}

/// Messaging bot API (Telegram style `sendMessage`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingBotConfig {
    pub token: Option<String>,

    /// Destination chat; numeric ids and `@channel` names both work
    pub chat_id: Option<String>,

    /// Base URL the `/bot<token>/sendMessage` path is appended to
    pub api_base: String,
}

impl Default for MessagingBotConfig {
    fn default() -> Self {
        Self {
            token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

/// Live WebSocket broadcast to viewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,

    /// Undelivered messages a viewer may fall behind by before it is dropped
    pub viewer_buffer: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 8765,
            viewer_buffer: subcast_broadcaster::DEFAULT_VIEWER_BUFFER,
        }
    }
}

impl BroadcastConfig {
    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Exporter configuration
///
/// Loaded once at startup and never changed afterwards. A destination is
/// enabled purely by its connection parameters being present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path the configuration was read from, if any
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Include the transcription (source language) in outgoing text
    pub output_transcribed_text: bool,

    /// Prefix outgoing text with `H:MM:SS,mmm --> H:MM:SS,mmm`
    pub output_timestamps: bool,

    /// Append-only text output; removed once at startup if present
    pub output_file: Option<PathBuf>,

    /// Proxy for all HTTP sinks, `host:port` or a full URL
    pub proxy: Option<String>,

    pub callback: CallbackConfig,
    pub chat_webhook: ChatWebhookConfig,
    pub messaging_bot: MessagingBotConfig,
    pub broadcast: BroadcastConfig,
}

impl OutputConfig {
    /// Load configuration
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used if it exists and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    Self::load_from(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: OutputConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get default config path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("subcast")
            .join("config.toml")
    }

    /// Names of the destinations this configuration enables, for logging
    pub fn enabled_destinations(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.output_file.is_some() {
            names.push("file");
        }
        if non_empty(&self.callback.url).is_some() {
            names.push("callback");
        }
        if non_empty(&self.chat_webhook.url).is_some() {
            names.push("chat-webhook");
        }
        if non_empty(&self.messaging_bot.token).is_some()
            && non_empty(&self.messaging_bot.chat_id).is_some()
        {
            names.push("messaging-bot");
        }
        if self.broadcast.enabled {
            names.push("broadcast");
        }
        names
    }
}

/// Treat empty strings the same as unset values
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Command-line arguments; every flag overrides the matching config value
#[derive(Debug, Default, Parser)]
#[command(
    name = "subcast-daemon",
    version,
    about = "Fan translation results out to files, webhooks and live viewers"
)]
pub struct Cli {
    /// Config file (default: <config dir>/subcast/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Include the transcription in outgoing text
    #[arg(long)]
    pub output_transcribed_text: bool,

    /// Prefix outgoing text with the time range
    #[arg(long)]
    pub output_timestamps: bool,

    /// Append results to this file
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    /// Proxy for HTTP sinks (host:port or URL)
    #[arg(long)]
    pub proxy: Option<String>,

    #[arg(long)]
    pub callback_url: Option<String>,

    #[arg(long)]
    pub callback_token: Option<String>,

    #[arg(long)]
    pub chat_webhook_url: Option<String>,

    #[arg(long)]
    pub bot_token: Option<String>,

    #[arg(long)]
    pub bot_chat_id: Option<String>,

    #[arg(long)]
    pub bot_api_base: Option<String>,

    #[arg(long)]
    pub broadcast_host: Option<String>,

    #[arg(long)]
    pub broadcast_port: Option<u16>,

    /// Do not start the WebSocket broadcast server
    #[arg(long)]
    pub no_broadcast: bool,
}

impl Cli {
    /// Load the config file and apply command-line overrides
    pub fn into_config(self) -> Result<OutputConfig> {
        let mut config = OutputConfig::load(self.config.as_deref())?;
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(self, config: &mut OutputConfig) {
        if self.output_transcribed_text {
            config.output_transcribed_text = true;
        }
        if self.output_timestamps {
            config.output_timestamps = true;
        }
        if self.output_file.is_some() {
            config.output_file = self.output_file;
        }
        if self.proxy.is_some() {
            config.proxy = self.proxy;
        }
        if self.callback_url.is_some() {
            config.callback.url = self.callback_url;
        }
        if self.callback_token.is_some() {
            config.callback.token = self.callback_token;
        }
        if self.chat_webhook_url.is_some() {
            config.chat_webhook.url = self.chat_webhook_url;
        }
        if self.bot_token.is_some() {
            config.messaging_bot.token = self.bot_token;
        }
        if self.bot_chat_id.is_some() {
            config.messaging_bot.chat_id = self.bot_chat_id;
        }
        if let Some(api_base) = self.bot_api_base {
            config.messaging_bot.api_base = api_base;
        }
        if let Some(host) = self.broadcast_host {
            config.broadcast.host = host;
        }
        if let Some(port) = self.broadcast_port {
            config.broadcast.port = port;
        }
        if self.no_broadcast {
            config.broadcast.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = OutputConfig::default();
        assert!(!config.output_timestamps);
        assert!(!config.output_transcribed_text);
        assert!(config.broadcast.enabled);
        assert_eq!(config.broadcast.bind_addr(), "localhost:8765");
        assert_eq!(config.messaging_bot.api_base, "https://api.telegram.org");
        assert_eq!(config.enabled_destinations(), vec!["broadcast"]);
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
output_timestamps = true
output_file = "/tmp/out.txt"
proxy = "127.0.0.1:7890"

[chat_webhook]
url = "https://discord.example/webhook"

[messaging_bot]
token = "123:abc"
chat_id = "-100200"

[broadcast]
port = 9000
"#
        )
        .unwrap();

        let config = OutputConfig::load(Some(file.path())).unwrap();
        assert!(config.output_timestamps);
        assert_eq!(config.output_file, Some(PathBuf::from("/tmp/out.txt")));
        assert_eq!(config.broadcast.port, 9000);
        assert_eq!(config.broadcast.host, "localhost");
        assert_eq!(config.messaging_bot.api_base, "https://api.telegram.org");
        assert_eq!(config.config_path.as_deref(), Some(file.path()));
        assert_eq!(
            config.enabled_destinations(),
            vec!["file", "chat-webhook", "messaging-bot", "broadcast"]
        );
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let result = OutputConfig::load(Some(Path::new("/nonexistent/subcast.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_bot_needs_token_and_chat_id() {
        let mut config = OutputConfig::default();
        config.messaging_bot.token = Some("123:abc".into());
        assert!(!config.enabled_destinations().contains(&"messaging-bot"));

        config.messaging_bot.chat_id = Some(String::new());
        assert!(!config.enabled_destinations().contains(&"messaging-bot"));

        config.messaging_bot.chat_id = Some("42".into());
        assert!(config.enabled_destinations().contains(&"messaging-bot"));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "subcast-daemon",
            "--output-timestamps",
            "--callback-url",
            "http://localhost:5700/send_msg",
            "--broadcast-port",
            "23456",
            "--no-broadcast",
        ]);
        let mut config = OutputConfig::default();
        cli.apply(&mut config);

        assert!(config.output_timestamps);
        assert_eq!(config.callback.url.as_deref(), Some("http://localhost:5700/send_msg"));
        assert_eq!(config.broadcast.port, 23456);
        assert!(!config.broadcast.enabled);
    }
}
