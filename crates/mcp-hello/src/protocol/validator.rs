//! JSON-RPC envelope validation.

use serde_json::Value;

use crate::types::{JsonRpcRequest, McpError, RequestId, JSONRPC_VERSION};

/// A request whose envelope is well-formed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRequest {
    pub id: RequestId,
    pub method: String,
    pub params: Option<Value>,
}

/// Why an envelope was rejected, plus the id to answer with.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidEnvelope {
    pub id: RequestId,
    pub error: McpError,
}

/// Validate that a JSON-RPC request is well-formed.
pub fn validate_request(request: JsonRpcRequest) -> Result<ValidRequest, InvalidEnvelope> {
    let Some(id) = RequestId::from_value(&request.id) else {
        return Err(InvalidEnvelope {
            id: RequestId::Null,
            error: McpError::InvalidRequest("id must be a string, number or null".to_string()),
        });
    };

    let reject = |message: String| InvalidEnvelope {
        id: id.clone(),
        error: McpError::InvalidRequest(message),
    };

    match &request.jsonrpc {
        Some(Value::String(v)) if v == JSONRPC_VERSION => {}
        Some(other) => {
            return Err(reject(format!(
                "jsonrpc must be \"{JSONRPC_VERSION}\", got {other}"
            )))
        }
        None => return Err(reject("jsonrpc member is missing".to_string())),
    }

    let method = match request.method {
        Some(Value::String(m)) if !m.is_empty() => m,
        Some(Value::String(_)) => return Err(reject("method must not be empty".to_string())),
        Some(_) => return Err(reject("method must be a string".to_string())),
        None => return Err(reject("method member is missing".to_string())),
    };

    Ok(ValidRequest {
        id,
        method,
        params: request.params,
    })
}
