//! Main request dispatcher: authenticate, decode, validate, route, invoke, reply.
//!
//! Each request walks the stages in order and leaves at the first failure. No
//! state is kept between requests.

use std::future::Future;
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{json, Map, Value};

use crate::auth::{AuthError, Authenticator, IdentityClaims};
use crate::types::{JsonRpcReply, JsonRpcResponse, McpError, McpResult, RequestId};

use super::codec;
use super::registry::{CallContext, MethodRegistry};
use super::validator::{validate_request, InvalidEnvelope, ValidRequest};

/// A fully built HTTP answer: status plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    /// JSON-RPC error envelope with `id: null`: 403 for callers outside the
    /// allow-list, 401 for everything else.
    pub fn auth_failure(err: &AuthError) -> Self {
        let (status, error) = match err {
            AuthError::Forbidden { .. } => {
                (StatusCode::FORBIDDEN, McpError::Forbidden(err.to_string()))
            }
            _ => (
                StatusCode::UNAUTHORIZED,
                McpError::Unauthorized(err.to_string()),
            ),
        };
        Self {
            status,
            body: codec::encode(&error.to_json_rpc_error(RequestId::Null).into()),
        }
    }

    /// 413 for a body over `limit` bytes.
    pub fn payload_too_large(limit: usize) -> Self {
        let body = json!({ "error": "Request body too large", "limit": limit });
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            body: body.to_string().into_bytes(),
        }
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Routes JSON-RPC requests to registered method handlers.
pub struct Dispatcher {
    registry: MethodRegistry,
    auth: Authenticator,
}

impl Dispatcher {
    pub fn new(registry: MethodRegistry, auth: Authenticator) -> Self {
        Self { registry, auth }
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn auth_required(&self) -> bool {
        self.auth.is_required()
    }

    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<Option<IdentityClaims>, AuthError> {
        self.auth.authenticate(authorization).await
    }

    /// Handle one HTTP request end to end.
    ///
    /// `body` is only awaited once the caller is authenticated, so a rejected
    /// request is never read. A body that cannot be read is answered with the
    /// reply it yields; every other outcome is a JSON-RPC envelope with status 200.
    pub async fn handle<B, F>(&self, authorization: Option<&str>, body: F) -> HttpReply
    where
        B: AsRef<[u8]>,
        F: Future<Output = Result<B, HttpReply>>,
    {
        let caller = match self.authenticate(authorization).await {
            Ok(caller) => caller,
            Err(e) => {
                tracing::warn!(error = %e, "rejected MCP request");
                return HttpReply::auth_failure(&e);
            }
        };

        let body = match body.await {
            Ok(body) => body,
            Err(reply) => return reply,
        };

        let reply = self.dispatch(body.as_ref(), caller).await;
        HttpReply::ok(codec::encode(&reply))
    }

    /// Decode, validate, route and invoke. Never fails: every outcome is a reply.
    pub async fn dispatch(&self, body: &[u8], caller: Option<IdentityClaims>) -> JsonRpcReply {
        let request = match codec::decode(body) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "undecodable request body");
                return e.to_json_rpc_error(RequestId::Null).into();
            }
        };

        let request = match validate_request(request) {
            Ok(request) => request,
            Err(InvalidEnvelope { id, error }) => {
                tracing::debug!(id = %id, error = %error, "invalid request envelope");
                return error.to_json_rpc_error(id).into();
            }
        };

        let id = request.id.clone();
        tracing::info!(
            method = %request.method,
            id = %id,
            caller = caller.as_ref().map(|c| c.subject.as_str()).unwrap_or("anonymous"),
            "received MCP request"
        );

        match self.invoke(request, caller).await {
            Ok(result) => JsonRpcResponse::new(id, result).into(),
            Err(e) => {
                match &e {
                    McpError::InternalError(detail) => {
                        tracing::error!(id = %id, detail = %detail, "handler failed")
                    }
                    other => tracing::warn!(id = %id, error = %other, "request failed"),
                }
                e.to_json_rpc_error(id).into()
            }
        }
    }

    async fn invoke(&self, request: ValidRequest, caller: Option<IdentityClaims>) -> McpResult<Value> {
        let handler = self
            .registry
            .lookup(&request.method)
            .map(Arc::clone)
            .ok_or_else(|| McpError::MethodNotFound(request.method.clone()))?;

        let params = match request.params {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(McpError::InvalidParams(
                    "params must be an object".to_string(),
                ))
            }
        };

        let ctx = CallContext {
            id: request.id,
            caller,
        };

        // A panicking handler becomes an internal error instead of taking the connection down.
        tokio::spawn(async move { handler.handle(&ctx, params).await })
            .await
            .unwrap_or_else(|e| {
                let detail = if e.is_panic() {
                    "handler panicked"
                } else {
                    "handler cancelled"
                };
                Err(McpError::InternalError(detail.to_string()))
            })
    }
}
