//! Proxy to an upstream greeting service.
//!
//! `POST /api/v1/proxy_hello` forwards a name to the upstream `GET /hello` and
//! re-wraps the answer.

pub mod client;
pub mod routes;

pub use client::{ProxyError, UpstreamClient};
pub use routes::{build_proxy_router, ProxyTransport, PROXY_INFO};
