//! HTTP client for the SMS/voice relay.

use async_trait::async_trait;
use serde::Serialize;

use super::{AlertDispatcher, AlertError};

#[derive(Debug, Serialize)]
struct SendSmsRequest<'a> {
    message: &'a str,
    recipient: &'a str,
}

#[derive(Debug, Serialize)]
struct MakeCallRequest<'a> {
    recipient: &'a str,
}

pub struct RelayClient {
    base_url: String,
    client: reqwest::Client,
}

impl RelayClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<(), AlertError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AlertError::Relay(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AlertError::Relay(format!(
                "{} returned HTTP {}",
                path,
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertDispatcher for RelayClient {
    async fn send_sms(&self, recipient: &str, message: &str) -> Result<(), AlertError> {
        self.post("/send-sms", &SendSmsRequest { message, recipient })
            .await
    }

    async fn make_call(&self, recipient: &str) -> Result<(), AlertError> {
        self.post("/make-call", &MakeCallRequest { recipient }).await
    }
}
