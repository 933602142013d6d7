//! Async HTTP client for the upstream `/hello` endpoint.

use serde_json::{json, Value};

use crate::config::UpstreamConfig;

/// Errors from a proxied call.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProxyError {
    /// Upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}")]
    Upstream { status: u16, body: Value },

    /// Upstream could not be reached.
    #[error("failed to reach upstream: {0}")]
    Transport(String),

    /// Upstream answered 2xx but not with the expected JSON.
    #[error("unexpected upstream response: {0}")]
    InvalidResponse(String),
}

/// Client for the upstream greeting service.
#[derive(Clone)]
pub struct UpstreamClient {
    base_url: String,
    http: reqwest::Client,
    id_token: Option<String>,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            id_token: config.id_token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call `GET {base}/hello?name=<name>`, optionally with the configured bearer token.
    pub async fn hello(&self, name: &str, with_auth: bool) -> Result<Value, ProxyError> {
        let url = format!("{}/hello", self.base_url);
        tracing::debug!(%url, name, with_auth, "calling upstream");

        let mut request = self.http.get(&url).query(&[("name", name)]);
        if with_auth {
            match &self.id_token {
                Some(token) => request = request.bearer_auth(token),
                None => tracing::warn!("upstream auth requested but no upstream token is configured"),
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProxyError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProxyError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "text": text }));
            tracing::warn!(status = status.as_u16(), "upstream call failed");
            return Err(ProxyError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&text).map_err(|e| ProxyError::InvalidResponse(e.to_string()))
    }
}
