use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{BroadcasterError, Result};
use crate::events::OutgoingMessage;

/// Viewer side of the broadcast channel
pub struct ViewerClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ViewerClient {
    /// Connect to `ws://host:port`
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _response) = connect_async(url).await?;
        Ok(Self { stream })
    }

    /// Next message from the server
    ///
    /// Control and binary frames are skipped. Returns `None` once the server
    /// closes the connection. A text frame that is not a valid message yields
    /// [`BroadcasterError::InvalidMessage`]; the connection stays usable.
    pub async fn next_message(&mut self) -> Option<Result<OutgoingMessage>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    let decoded = serde_json::from_str(&text).map_err(|source| {
                        BroadcasterError::InvalidMessage {
                            payload: text.clone(),
                            source,
                        }
                    });
                    return Some(decoded);
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Render a message the way the terminal viewer prints it
pub fn render_message(message: &OutgoingMessage) -> String {
    let mut lines = Vec::new();

    if let Some(timestamp) = &message.timestamp {
        lines.push(format!("[{}]", timestamp));
    }
    if let Some(text) = message.transcribed_text.as_deref().filter(|t| !t.is_empty()) {
        lines.push("Original:".to_string());
        lines.push(text.to_string());
    }
    if let Some(text) = message.translated_text.as_deref().filter(|t| !t.is_empty()) {
        lines.push("Translation:".to_string());
        lines.push(text.to_string());
    }
    lines.push(format!(
        "Time range: {}s - {}s",
        message.time_range.0, message.time_range.1
    ));

    lines.join("\n")
}
