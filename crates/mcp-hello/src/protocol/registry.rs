//! Method registration and lookup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use hello_tools::ToolInvoker;

use crate::auth::IdentityClaims;
use crate::types::{McpResult, RequestId};

use super::methods::{InitializeMethod, PingMethod, ToolsListMethod};
use super::tool_call::ToolsCallMethod;

/// Per-request information handed to every method handler.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub id: RequestId,
    /// Present only when authentication is enabled.
    pub caller: Option<IdentityClaims>,
}

/// Implements one JSON-RPC method.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn handle(&self, ctx: &CallContext, params: Map<String, Value>) -> McpResult<Value>;
}

/// Method name to handler map. Built once at startup and only read afterwards.
#[derive(Default, Clone)]
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

/// `tools.call` and `tools/call` name the same method.
fn normalize(method: &str) -> String {
    method.replace('.', "/")
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The methods this server speaks, backed by `invoker` for tools.
    pub fn standard(invoker: Arc<dyn ToolInvoker>) -> Self {
        let mut registry = Self::new();
        registry.register("initialize", InitializeMethod);
        registry.register("ping", PingMethod);
        registry.register("tools/list", ToolsListMethod::new(Arc::clone(&invoker)));
        registry.register("tools/call", ToolsCallMethod::new(invoker));
        registry
    }

    /// Add a handler.
    ///
    /// # Panics
    ///
    /// Panics if `name` (after `.` → `/` normalization) is already registered.
    pub fn register(&mut self, name: &str, handler: impl MethodHandler + 'static) {
        let name = normalize(name);
        if self.handlers.contains_key(&name) {
            panic!("method `{name}` registered twice");
        }
        self.handlers.insert(name, Arc::new(handler));
    }

    pub fn lookup(&self, method: &str) -> Option<&Arc<dyn MethodHandler>> {
        self.handlers.get(&normalize(method))
    }

    /// Registered method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
