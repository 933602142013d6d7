//! Configuration loading and resolution.
//!
//! Values come from CLI flags, then environment variables, then defaults. The
//! environment is read through a lookup function so resolution can be tested
//! without touching the process environment.

use std::time::Duration;

use crate::auth::{GOOGLE_ISSUERS, GOOGLE_JWKS_URL};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Configuration errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Token verification settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    pub required: bool,
    /// Empty disables the audience check.
    pub expected_audience: String,
    pub issuers: Vec<String>,
    pub jwks_url: String,
    pub jwks_ttl: Duration,
    /// Shared HS256 secret; replaces the JWKS source when set.
    pub hmac_secret: Option<String>,
    /// Caller emails allowed past authentication. Empty allows every verified caller.
    pub allowed_emails: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            required: false,
            expected_audience: String::new(),
            issuers: GOOGLE_ISSUERS.iter().map(|s| s.to_string()).collect(),
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            jwks_ttl: crate::auth::keys::DEFAULT_JWKS_TTL,
            hmac_secret: None,
            allowed_emails: Vec::new(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpOptions {
    pub addr: String,
    pub body_limit: usize,
    pub cors: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            body_limit: DEFAULT_BODY_LIMIT,
            cors: false,
        }
    }
}

/// Settings for the outbound proxy to the upstream greeting service.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Pre-issued identity token sent when a proxied call asks for auth.
    pub id_token: Option<String>,
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_URL.to_string(),
            id_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Everything the binary needs to start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerConfig {
    pub auth: AuthConfig,
    pub http: HttpOptions,
    pub upstream: UpstreamConfig,
}

impl ServerConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup("REQUIRE_AUTH") {
            config.auth.required = parse_bool("REQUIRE_AUTH", &v)?;
        }
        if let Some(v) = lookup("AUTH_AUDIENCE") {
            config.auth.expected_audience = v.trim().to_string();
        }
        if let Some(v) = lookup("AUTH_ISSUERS") {
            config.auth.issuers = parse_issuers("AUTH_ISSUERS", &v)?;
        }
        if let Some(v) = non_empty(lookup("AUTH_JWKS_URL")) {
            config.auth.jwks_url = v;
        }
        config.auth.hmac_secret = non_empty(lookup("AUTH_HMAC_SECRET"));
        if let Some(v) = lookup("AUTH_ALLOWED_EMAILS") {
            config.auth.allowed_emails = parse_list(&v);
        }

        if let Some(v) = non_empty(lookup("PORT")) {
            let port: u16 = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                value: v.clone(),
            })?;
            config.http.addr = format!("0.0.0.0:{port}");
        }
        if let Some(v) = lookup("CORS_ALLOW_ALL") {
            config.http.cors = parse_bool("CORS_ALLOW_ALL", &v)?;
        }

        if let Some(v) = non_empty(lookup("SERVER_URL")) {
            config.upstream.base_url = v;
        }
        config.upstream.id_token = non_empty(lookup("UPSTREAM_ID_TOKEN"));

        Ok(config)
    }
}

/// `1`/`true`/`yes`/`on` and `0`/`false`/`no`/`off`/empty, case-insensitive.
pub fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Comma-separated list, blanks dropped.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Issuer allow-list. A value that lists no issuer at all is rejected rather
/// than leaving the issuer unchecked.
pub fn parse_issuers(key: &str, value: &str) -> Result<Vec<String>, ConfigError> {
    let issuers = parse_list(value);
    if issuers.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(issuers)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
