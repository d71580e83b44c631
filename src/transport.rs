//! HTTP transport for provider calls.
//!
//! One POST per call, no retries. A non-2xx status is a hard failure that
//! carries the response body as diagnostic text. There is no timeout unless
//! `[http] timeout_secs` is set; without one, a hung provider blocks the
//! calling handler indefinitely.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::provider::ProviderRequest;

/// Sends a [`ProviderRequest`] and returns the raw response body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: &ProviderRequest) -> Result<String>;
}

/// Real transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: &ProviderRequest) -> Result<String> {
        let mut builder = self.client.post(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        let response = builder
            .json(&request.body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| {
                Error::Transport(format!("failed to read response: {}", e.without_url()))
            })?;
        debug!(status = status.as_u16(), bytes = body.len(), "provider responded");

        if !status.is_success() {
            return Err(Error::Transport(format!("HTTP {}: {}", status, body)));
        }
        Ok(body)
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Canned transport that records every request body it is handed.
    pub struct MockTransport {
        reply: std::result::Result<String, String>,
        seen: Mutex<Vec<serde_json::Value>>,
    }

    impl MockTransport {
        pub fn replying(body: impl Into<String>) -> Self {
            Self {
                reply: Ok(body.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self {
                reply: Err(message.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        pub fn last_body(&self) -> Option<serde_json::Value> {
            self.seen.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn post(&self, request: &ProviderRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.body.clone());
            self.reply.clone().map_err(Error::Transport)
        }
    }
}
