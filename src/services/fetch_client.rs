use std::time::Duration;

use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;

use crate::ports::fetch::{FetchClient, FetchError, RequestInit};

pub struct ReqwestFetchClient {
    client: Client,
    timeout: Duration,
}

impl ReqwestFetchClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    async fn send(&self, url: &str, init: &RequestInit) -> Result<Value, FetchError> {
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout);
        for (name, value) in &init.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|error| FetchError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Error bodies are informational only
            let body = response.json::<Value>().await.ok();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|error| FetchError::Decode(error.to_string()))
    }
}

#[async_trait::async_trait]
impl FetchClient for ReqwestFetchClient {
    async fn get_json(&self, url: &str, init: RequestInit) -> Result<Value, FetchError> {
        if init.cancel.is_cancelled() {
            return Err(FetchError::Aborted);
        }

        tracing::debug!(url, "GET");
        tokio::select! {
            _ = init.cancel.cancelled() => Err(FetchError::Aborted),
            result = self.send(url, &init) => result,
        }
    }
}
