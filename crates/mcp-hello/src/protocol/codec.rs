//! Envelope codec: raw request bytes in, response bytes out.

use serde_json::Value;

use crate::types::{JsonRpcReply, JsonRpcRequest, McpError, McpResult};

/// Written if a reply ever fails to serialize.
const FALLBACK_REPLY: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#;

/// Parse a request body into an unvalidated envelope.
///
/// Fails with [`McpError::ParseError`] when the bytes are not JSON or the
/// top-level value is not an object. Envelope shape is not checked here.
pub fn decode(bytes: &[u8]) -> McpResult<JsonRpcRequest> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| McpError::ParseError(e.to_string()))?;

    if !value.is_object() {
        return Err(McpError::ParseError(
            "request body must be a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| McpError::ParseError(e.to_string()))
}

/// Serialize a reply to compact JSON.
pub fn encode(reply: &JsonRpcReply) -> Vec<u8> {
    serde_json::to_vec(reply).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize JSON-RPC reply");
        FALLBACK_REPLY.as_bytes().to_vec()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JsonRpcResponse, RequestId};
    use serde_json::json;

    #[test]
    fn test_decode_valid() {
        let req = decode(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        assert_eq!(req.method, Some(json!("ping")));
        assert_eq!(req.id, json!(1));
        assert!(req.params.is_none());
    }

    #[test]
    fn test_decode_tolerates_missing_members() {
        let req = decode(b"{}").unwrap();
        assert!(req.jsonrpc.is_none());
        assert!(req.method.is_none());
        assert_eq!(req.id, Value::Null);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        for body in [&b""[..], b"   ", b"{\"broken\":", b"not json", b"\xff\xfe"] {
            let err = decode(body).unwrap_err();
            assert_eq!(err.code(), -32700);
        }
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        for body in [&b"[]"[..], b"[{\"jsonrpc\":\"2.0\"}]", b"42", b"\"x\"", b"null"] {
            assert!(matches!(decode(body), Err(McpError::ParseError(_))));
        }
    }

    #[test]
    fn test_encode_echoes_id() {
        let id = RequestId::from_value(&json!("req-7")).unwrap();
        let bytes = encode(&JsonRpcResponse::new(id, json!({"ok": true})).into());
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v, json!({"jsonrpc": "2.0", "id": "req-7", "result": {"ok": true}}));
    }

    #[test]
    fn test_fallback_is_valid_envelope() {
        let v: Value = serde_json::from_str(FALLBACK_REPLY).unwrap();
        assert_eq!(v["id"], Value::Null);
        assert_eq!(v["error"]["code"], -32603);
    }
}
