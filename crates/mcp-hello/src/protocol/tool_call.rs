//! `tools/call`: parameter normalization and tool invocation.
//!
//! Two parameter shapes are accepted:
//!
//! * nested: `{"name": "hello", "arguments": {"name": "Ada"}}`
//! * legacy flat: `{"tool": "hello", "name": "Ada"}`
//!
//! In the legacy shape `name` is the greeting argument, not the tool, so the
//! legacy check runs before the `name`-then-`tool` identifier rule.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use hello_tools::ToolInvoker;

use crate::types::{McpError, McpResult};

use super::registry::{CallContext, MethodHandler};

/// A resolved tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub arguments: Map<String, Value>,
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Resolve either accepted parameter shape into a [`ToolCall`].
///
/// Non-empty `arguments` wins. Otherwise, when both `tool` and `name` are
/// present, the call is legacy and `name` becomes the sole argument. The tool
/// identifier is `name`, falling back to `tool`.
pub fn normalize_tool_call(params: &Map<String, Value>) -> McpResult<ToolCall> {
    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(McpError::InvalidParams(
                "arguments must be an object".to_string(),
            ))
        }
    };

    if arguments.is_empty() && params.contains_key("tool") && params.contains_key("name") {
        let tool = non_empty_str(params.get("tool")).ok_or_else(|| {
            McpError::InvalidParams("tool must be a non-empty string".to_string())
        })?;
        let mut legacy = Map::new();
        legacy.insert("name".to_string(), params["name"].clone());
        return Ok(ToolCall {
            tool: tool.to_string(),
            arguments: legacy,
        });
    }

    let tool = non_empty_str(params.get("name"))
        .or_else(|| non_empty_str(params.get("tool")))
        .ok_or_else(|| McpError::InvalidParams("missing tool name".to_string()))?;

    Ok(ToolCall {
        tool: tool.to_string(),
        arguments,
    })
}

/// `tools/call` handler.
pub struct ToolsCallMethod {
    invoker: Arc<dyn ToolInvoker>,
}

impl ToolsCallMethod {
    pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl MethodHandler for ToolsCallMethod {
    async fn handle(&self, ctx: &CallContext, params: Map<String, Value>) -> McpResult<Value> {
        let call = normalize_tool_call(&params)?;
        tracing::debug!(id = %ctx.id, tool = %call.tool, "calling tool");

        self.invoker
            .invoke(&call.tool, &call.arguments)
            .await
            .map_err(McpError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn args(value: Value) -> Map<String, Value> {
        params(value)
    }

    #[test]
    fn test_nested_shape() {
        let call = normalize_tool_call(&params(json!({
            "name": "hello", "arguments": {"name": "Ada"}
        })))
        .unwrap();
        assert_eq!(call.tool, "hello");
        assert_eq!(call.arguments, args(json!({"name": "Ada"})));
    }

    #[test]
    fn test_legacy_shape() {
        let call = normalize_tool_call(&params(json!({"tool": "hello", "name": "Ada"}))).unwrap();
        assert_eq!(call.tool, "hello");
        assert_eq!(call.arguments, args(json!({"name": "Ada"})));
    }

    #[test]
    fn test_legacy_with_empty_arguments() {
        let call = normalize_tool_call(&params(json!({
            "tool": "hello", "name": "Ada", "arguments": {}
        })))
        .unwrap();
        assert_eq!(call.tool, "hello");
        assert_eq!(call.arguments, args(json!({"name": "Ada"})));
    }

    #[test]
    fn test_non_empty_arguments_win_over_legacy() {
        let call = normalize_tool_call(&params(json!({
            "tool": "other", "name": "hello", "arguments": {"name": "Grace"}
        })))
        .unwrap();
        assert_eq!(call.tool, "hello");
        assert_eq!(call.arguments, args(json!({"name": "Grace"})));
    }

    #[test]
    fn test_tool_only() {
        let call = normalize_tool_call(&params(json!({"tool": "goodbye"}))).unwrap();
        assert_eq!(call.tool, "goodbye");
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn test_name_only() {
        let call = normalize_tool_call(&params(json!({"name": "hello"}))).unwrap();
        assert_eq!(call.tool, "hello");
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn test_missing_identifier() {
        let err = normalize_tool_call(&Map::new()).unwrap_err();
        assert_eq!(err.code(), -32602);
    }

    #[test]
    fn test_arguments_must_be_object() {
        let err = normalize_tool_call(&params(json!({
            "name": "hello", "arguments": ["Ada"]
        })))
        .unwrap_err();
        assert_eq!(err.code(), -32602);
    }
}
