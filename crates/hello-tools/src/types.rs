//! Core data types shared by tools and their callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Static description of a callable tool, as advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Payload returned by the greeting tool and the `/hello` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Errors a tool invocation can produce.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {0}")]
    Failed(String),
}

/// Convenience result type.
pub type ToolResult<T> = Result<T, ToolError>;
