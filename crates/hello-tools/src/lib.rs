//! hello-tools: the tool contract served over MCP, plus the `hello` greeting tool.

pub mod greeting;
pub mod invoker;
pub mod types;

pub use greeting::{greet, HelloTool, DEFAULT_NAME};
pub use invoker::{Tool, ToolInvoker, ToolSet};
pub use types::*;
