//! Axum routes for the proxy service.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use hello_tools::DEFAULT_NAME;

use crate::config::UpstreamConfig;
use crate::transport::http::serve;
use crate::transport::HttpTransportError;

use super::client::{ProxyError, UpstreamClient};

pub const PROXY_INFO: &str = "Called through client proxy";

#[derive(Debug, Deserialize)]
struct ProxyHelloRequest {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default)]
    enable_auth: bool,
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

/// Routes: `POST /api/v1/proxy_hello`, `GET /health`.
pub fn build_proxy_router(client: Arc<UpstreamClient>) -> Router {
    Router::new()
        .route("/api/v1/proxy_hello", post(proxy_hello))
        .route("/health", get(handle_health))
        .with_state(client)
        .layer(TraceLayer::new_for_http())
}

async fn proxy_hello(
    State(client): State<Arc<UpstreamClient>>,
    Json(request): Json<ProxyHelloRequest>,
) -> Response {
    tracing::info!(name = %request.name, enable_auth = request.enable_auth, "proxying hello");

    let result = match client.hello(&request.name, request.enable_auth).await {
        Ok(body) => body,
        Err(e) => return proxy_error(e),
    };

    match result.get("message").and_then(Value::as_str) {
        Some(message) => Json(json!({
            "proxied_message": message,
            "proxy_info": PROXY_INFO,
        }))
        .into_response(),
        None => internal_error("upstream response has no message"),
    }
}

fn proxy_error(e: ProxyError) -> Response {
    let message = format!("Failed to call hello server: {e}");
    match e {
        ProxyError::Upstream { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            (
                status,
                Json(json!({
                    "detail": {
                        "error": message,
                        "status": "error",
                        "upstream_error": body,
                    }
                })),
            )
                .into_response()
        }
        ProxyError::Transport(ref detail) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "detail": {
                    "error": message,
                    "status": "error",
                    "upstream_error": { "detail": detail },
                }
            })),
        )
            .into_response(),
        ProxyError::InvalidResponse(detail) => internal_error(&detail),
    }
}

fn internal_error(detail: &str) -> Response {
    tracing::error!(detail, "proxy failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "detail": {
                "error": format!("Internal server error: {detail}"),
                "status": "error",
            }
        })),
    )
        .into_response()
}

async fn handle_health(State(client): State<Arc<UpstreamClient>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "upstream": client.base_url(),
    }))
}

/// Serves the proxy router over HTTP.
pub struct ProxyTransport {
    client: Arc<UpstreamClient>,
}

impl ProxyTransport {
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            client: Arc::new(UpstreamClient::new(config)),
        }
    }

    pub async fn run(self, addr: &str) -> Result<(), HttpTransportError> {
        tracing::info!(upstream = %self.client.base_url(), "proxy forwarding to upstream");
        serve(addr, build_proxy_router(self.client)).await
    }
}
