//! The `hello` tool: greet a name with a friendly message.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::invoker::Tool;
use crate::types::{Greeting, ToolDescriptor, ToolResult};

/// Name used when the caller does not provide one.
pub const DEFAULT_NAME: &str = "World";

/// Build the greeting for `name`. Absent or empty names fall back to [`DEFAULT_NAME`].
pub fn greet(name: Option<&str>) -> Greeting {
    let name = name.filter(|n| !n.is_empty()).unwrap_or(DEFAULT_NAME);
    Greeting {
        message: format!("Hello, {name}!"),
        kind: "greeting".to_string(),
    }
}

/// The `hello` tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct HelloTool;

impl HelloTool {
    pub const NAME: &'static str = "hello";
}

#[async_trait]
impl Tool for HelloTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            "Greets a name with a friendly message",
            json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name to greet",
                        "default": DEFAULT_NAME
                    }
                },
                "required": []
            }),
        )
    }

    async fn call(&self, arguments: &Map<String, Value>) -> ToolResult<Value> {
        // Non-string scalars are greeted by their JSON text.
        let rendered = match arguments.get("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        let greeting = greet(rendered.as_deref());
        tracing::debug!(message = %greeting.message, "hello tool invoked");
        Ok(json!(greeting))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_greet_named() {
        assert_eq!(greet(Some("Ada")).message, "Hello, Ada!");
    }

    #[test]
    fn test_greet_defaults_to_world() {
        assert_eq!(greet(None).message, "Hello, World!");
        assert_eq!(greet(Some("")).message, "Hello, World!");
    }

    #[tokio::test]
    async fn test_call_with_name() {
        let out = HelloTool.call(&args(json!({"name": "Ada"}))).await.unwrap();
        assert_eq!(out, json!({"message": "Hello, Ada!", "type": "greeting"}));
    }

    #[tokio::test]
    async fn test_call_null_name_is_world() {
        let out = HelloTool.call(&args(json!({"name": null}))).await.unwrap();
        assert_eq!(out["message"], "Hello, World!");
    }

    #[tokio::test]
    async fn test_call_numeric_name_is_rendered() {
        let out = HelloTool.call(&args(json!({"name": 42}))).await.unwrap();
        assert_eq!(out["message"], "Hello, 42!");
    }

    #[test]
    fn test_descriptor_schema() {
        let d = HelloTool.descriptor();
        assert_eq!(d.name, "hello");
        assert_eq!(d.input_schema["properties"]["name"]["type"], "string");
    }
}
