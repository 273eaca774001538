use serde_json::json;

use super::SinkError;

/// Chat webhook that receives one message per line
///
/// The target renders embedded newlines poorly, so each line of the text is
/// posted separately as `{"content": line}`. Blank lines are skipped because
/// the service rejects empty content.
#[derive(Debug, Clone)]
pub struct ChatWebhookSink {
    client: reqwest::Client,
    url: String,
}

impl ChatWebhookSink {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    pub async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        let mut total = 0;
        let mut errors = Vec::new();

        for line in text.split('\n').filter(|line| !line.trim().is_empty()) {
            total += 1;
            // A failed line must not hold back the rest
            if let Err(e) = self.post_line(line).await {
                tracing::debug!("Chat webhook line {} failed: {}", total, e);
                errors.push(e);
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 if total == 1 => Err(errors.remove(0)),
            failed => Err(SinkError::PartialDelivery { failed, total }),
        }
    }

    async fn post_line(&self, line: &str) -> Result<(), SinkError> {
        self.client
            .post(&self.url)
            .json(&json!({ "content": line }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
