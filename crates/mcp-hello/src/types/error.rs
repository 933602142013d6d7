//! Error types and JSON-RPC error codes for the MCP server.

use serde_json::{json, Value};

use hello_tools::ToolError;

use super::message::{JsonRpcError, RequestId};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Server-defined error codes.
pub mod mcp_error_codes {
    /// Missing or rejected bearer token.
    pub const UNAUTHORIZED: i32 = -32001;
    /// Verified caller outside the allow-list.
    pub const FORBIDDEN: i32 = -32003;
}

/// All errors that can be reported inside a JSON-RPC envelope.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Unexpected handler failure. Rendered as "Internal error"; the detail only
    /// travels in `data`.
    #[error("Internal error")]
    InternalError(String),

    #[error("Unauthorized")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden(String),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) | McpError::ToolNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_) => INTERNAL_ERROR,
            McpError::Unauthorized(_) => mcp_error_codes::UNAUTHORIZED,
            McpError::Forbidden(_) => mcp_error_codes::FORBIDDEN,
        }
    }

    /// Structured `data` member for the error object.
    pub fn data(&self) -> Option<Value> {
        match self {
            McpError::MethodNotFound(method) => Some(json!({ "method": method })),
            McpError::ToolNotFound(tool) => Some(json!({ "tool": tool })),
            McpError::InternalError(detail) => Some(json!({ "detail": first_line(detail) })),
            McpError::Unauthorized(reason) | McpError::Forbidden(reason) => {
                Some(json!({ "reason": reason }))
            }
            McpError::ParseError(detail) => Some(json!({ "detail": first_line(detail) })),
            McpError::InvalidRequest(_) | McpError::InvalidParams(_) => None,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError::new(id, self.code(), self.to_string(), self.data())
    }
}

fn first_line(detail: &str) -> String {
    detail.lines().next().unwrap_or_default().trim().to_string()
}

impl From<ToolError> for McpError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::NotFound(tool) => McpError::ToolNotFound(tool),
            ToolError::InvalidArguments(msg) => McpError::InvalidParams(msg),
            ToolError::Failed(msg) => McpError::InternalError(msg),
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;
