use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Transport;
use crate::error::TransportError;

#[derive(Serialize)]
struct MessageRequest<'a> {
    #[serde(rename = "sessionId")]
    session_id: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct SessionResponse {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// `Transport` over HTTP/JSON
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn create_session(&self) -> Result<String, TransportError> {
        let url = format!("{}/v1/sessions", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let session: SessionResponse = response.json().await?;
        session
            .session_id
            .filter(|id| !id.is_empty())
            .ok_or(TransportError::MissingSessionId)
    }

    async fn send_message(&self, session_id: &str, message: &str) -> Result<Value, TransportError> {
        let url = format!("{}/v1/agent/message", self.base_url);

        let request = MessageRequest { session_id, message };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }
}
