//! Tool registration and dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::greeting::HelloTool;
use crate::types::{ToolDescriptor, ToolError, ToolResult};

/// Executes named tools on behalf of the `tools/call` method.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Descriptors of every tool this invoker can run.
    fn descriptors(&self) -> Vec<ToolDescriptor>;

    /// Run `tool` with `arguments`.
    ///
    /// Returns [`ToolError::NotFound`] when no tool by that name exists.
    async fn invoke(&self, tool: &str, arguments: &Map<String, Value>) -> ToolResult<Value>;
}

/// A single callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    async fn call(&self, arguments: &Map<String, Value>) -> ToolResult<Value>;
}

/// Fixed set of tools, keyed by name. Built once at startup.
#[derive(Default, Clone)]
pub struct ToolSet {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tools this server ships with.
    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        set.register(HelloTool);
        set
    }

    /// Add a tool.
    ///
    /// # Panics
    ///
    /// Panics if a tool with the same name is already registered.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.descriptor().name;
        if self.tools.contains_key(&name) {
            panic!("tool `{name}` registered twice");
        }
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolInvoker for ToolSet {
    fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor()).collect()
    }

    async fn invoke(&self, tool: &str, arguments: &Map<String, Value>) -> ToolResult<Value> {
        match self.tools.get(tool) {
            Some(t) => t.call(arguments).await,
            None => Err(ToolError::NotFound(tool.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_defaults_contain_hello() {
        let set = ToolSet::with_defaults();
        assert_eq!(set.len(), 1);
        let names: Vec<_> = set.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let set = ToolSet::with_defaults();
        let err = set.invoke("goodbye", &Map::new()).await.unwrap_err();
        assert_eq!(err, ToolError::NotFound("goodbye".into()));
    }

    #[tokio::test]
    async fn test_invoke_hello() {
        let set = ToolSet::with_defaults();
        let mut args = Map::new();
        args.insert("name".into(), json!("Ada"));
        let out = set.invoke("hello", &args).await.unwrap();
        assert_eq!(out["message"], "Hello, Ada!");
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_registration_panics() {
        let mut set = ToolSet::with_defaults();
        set.register(HelloTool);
    }
}
