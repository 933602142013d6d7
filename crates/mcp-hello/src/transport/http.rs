//! HTTP transport: `/mcp` JSON-RPC, `/hello` greeting and `/health`.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::HttpOptions;
use crate::protocol::HttpReply;
use crate::server::Server;
use crate::types::McpError;

use super::HttpTransportError;

/// Shared state passed to all handlers via axum State.
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<Server>,
}

impl IntoResponse for HttpReply {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Builds the router with every route and layer.
///
/// `/mcp` bodies are capped at `options.body_limit` bytes, read only after the
/// caller is authenticated.
pub fn build_router(state: AppState, options: &HttpOptions) -> Router {
    let body_limit = options.body_limit;
    let mcp = post(
        move |state: State<AppState>, headers: HeaderMap, body: Body| {
            handle_mcp(state, headers, body, body_limit)
        },
    )
    .fallback(method_not_allowed);

    let router = Router::new()
        .route("/mcp", mcp)
        .route("/hello", get(handle_hello))
        .route("/health", get(handle_health))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    if options.cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

async fn handle_mcp(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
    limit: usize,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let read_body = async move {
        axum::body::to_bytes(body, limit).await.map_err(|e| {
            tracing::warn!(error = %e, limit, "request body rejected");
            HttpReply::payload_too_large(limit)
        })
    };
    state
        .server
        .dispatcher()
        .handle(authorization(&headers), read_body)
        .instrument(tracing::info_span!("mcp", %request_id))
        .await
        .into_response()
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(json!({ "error": "POST required" })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct HelloQuery {
    name: Option<String>,
}

async fn handle_hello(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HelloQuery>,
) -> Response {
    if let Err(e) = state
        .server
        .dispatcher()
        .authenticate(authorization(&headers))
        .await
    {
        tracing::warn!(error = %e, "rejected /hello request");
        return HttpReply::auth_failure(&e).into_response();
    }

    match state.server.hello(query.name).await {
        Ok(greeting) => Json(greeting).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "greeting failed");
            let detail = match &e {
                McpError::InternalError(detail) => detail.clone(),
                other => other.to_string(),
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal error", "detail": detail })),
            )
                .into_response()
        }
    }
}

/// Health check endpoint, never authenticated.
async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "auth_required": state.server.dispatcher().auth_required(),
    }))
}

/// Serves the MCP router over HTTP.
pub struct HttpTransport {
    state: AppState,
    options: HttpOptions,
}

impl HttpTransport {
    pub fn new(server: Arc<Server>, options: HttpOptions) -> Self {
        Self {
            state: AppState { server },
            options,
        }
    }

    /// Bind and serve until Ctrl-C.
    pub async fn run(self) -> Result<(), HttpTransportError> {
        let router = build_router(self.state, &self.options);
        serve(&self.options.addr, router).await
    }
}

/// Bind `addr` and serve `router` with graceful shutdown.
pub(crate) async fn serve(addr: &str, router: Router) -> Result<(), HttpTransportError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| HttpTransportError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;

    tracing::info!("HTTP transport listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| HttpTransportError::Serve(e.to_string()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
