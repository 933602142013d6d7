//! mcp-hello: authenticated MCP (JSON-RPC 2.0) server over HTTP.

pub mod auth;
pub mod config;
pub mod protocol;
pub mod proxy;
pub mod server;
pub mod transport;
pub mod types;

pub use config::ServerConfig;
pub use protocol::Dispatcher;
pub use server::Server;
pub use transport::HttpTransport;
