use reqwest::header::AUTHORIZATION;

use super::SinkError;

/// Form-encoded `POST` to a generic bot bridge
#[derive(Debug, Clone)]
pub struct CallbackSink {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl CallbackSink {
    pub fn new(client: reqwest::Client, url: &str, token: Option<&str>) -> Self {
        Self {
            client,
            url: url.to_string(),
            token: token.map(str::to_string),
        }
    }

    pub async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        let mut request = self.client.post(&self.url).form(&[("message", text)]);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        request.send().await?.error_for_status()?;
        Ok(())
    }
}
