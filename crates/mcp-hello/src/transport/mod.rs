//! Transport layer for MCP communication.

mod error;
pub mod http;

pub use error::HttpTransportError;
pub use http::{build_router, AppState, HttpTransport};
