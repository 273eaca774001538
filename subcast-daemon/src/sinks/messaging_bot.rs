use super::SinkError;

/// Telegram style bot API `sendMessage`
#[derive(Debug, Clone)]
pub struct MessagingBotSink {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl MessagingBotSink {
    pub fn new(client: reqwest::Client, api_base: &str, token: &str, chat_id: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    /// Request URL for `text`; query values are percent-encoded
    pub fn send_message_url(&self, text: &str) -> String {
        format!(
            "{}/bot{}/sendMessage?chat_id={}&text={}",
            self.api_base,
            self.token,
            urlencoding::encode(&self.chat_id),
            urlencoding::encode(text)
        )
    }

    pub async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        let url = self.send_message_url(text);
        // The URL carries the bot token; keep it out of logged errors
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| e.without_url())?;
        response.error_for_status().map_err(|e| e.without_url())?;
        Ok(())
    }
}
