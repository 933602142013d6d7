//! Handlers for the static methods: initialize, ping, tools/list.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use hello_tools::ToolInvoker;

use crate::types::{InitializeResult, McpError, McpResult, ToolListResult};

use super::registry::{CallContext, MethodHandler};

fn to_value(value: impl serde::Serialize) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}

/// `initialize`: static server info; params are ignored.
pub struct InitializeMethod;

#[async_trait]
impl MethodHandler for InitializeMethod {
    async fn handle(&self, ctx: &CallContext, params: Map<String, Value>) -> McpResult<Value> {
        if let Some(client) = params.get("clientInfo").and_then(|c| c.get("name")) {
            tracing::info!(id = %ctx.id, client = %client, "client initializing");
        }
        to_value(InitializeResult::default_result())
    }
}

/// `ping`: liveness check over JSON-RPC.
pub struct PingMethod;

#[async_trait]
impl MethodHandler for PingMethod {
    async fn handle(&self, _ctx: &CallContext, _params: Map<String, Value>) -> McpResult<Value> {
        Ok(Value::Object(Map::new()))
    }
}

/// `tools/list`: descriptors of every available tool.
pub struct ToolsListMethod {
    invoker: Arc<dyn ToolInvoker>,
}

impl ToolsListMethod {
    pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl MethodHandler for ToolsListMethod {
    async fn handle(&self, _ctx: &CallContext, _params: Map<String, Value>) -> McpResult<Value> {
        to_value(ToolListResult {
            tools: self.invoker.descriptors(),
        })
    }
}
