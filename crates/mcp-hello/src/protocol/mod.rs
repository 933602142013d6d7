//! MCP protocol handling: JSON-RPC decoding, routing and dispatch.

pub mod codec;
pub mod dispatcher;
pub mod methods;
pub mod registry;
pub mod tool_call;
pub mod validator;

pub use dispatcher::{Dispatcher, HttpReply};
pub use registry::{CallContext, MethodHandler, MethodRegistry};
pub use tool_call::{normalize_tool_call, ToolCall};
