//! The explicit server context: method registry, authentication policy and
//! tool invoker, built once and shared by reference with every request.

use std::sync::Arc;

use jsonwebtoken::Algorithm;
use serde_json::{Map, Value};

use hello_tools::{HelloTool, ToolInvoker, ToolSet};

use crate::auth::{Authenticator, JwksKeySource, KeySource, StaticKeySource, TokenVerifier};
use crate::config::AuthConfig;
use crate::protocol::{Dispatcher, MethodRegistry};
use crate::types::McpResult;

pub struct Server {
    dispatcher: Dispatcher,
    invoker: Arc<dyn ToolInvoker>,
}

impl Server {
    pub fn new(auth: Authenticator, invoker: Arc<dyn ToolInvoker>) -> Self {
        let registry = MethodRegistry::standard(Arc::clone(&invoker));
        Self {
            dispatcher: Dispatcher::new(registry, auth),
            invoker,
        }
    }

    /// Server with the default tool set and authentication built from `config`.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(authenticator(config), Arc::new(ToolSet::with_defaults()))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn invoker(&self) -> &Arc<dyn ToolInvoker> {
        &self.invoker
    }

    /// The greeting behind `GET /hello`.
    pub async fn hello(&self, name: Option<String>) -> McpResult<Value> {
        let mut arguments = Map::new();
        if let Some(name) = name {
            arguments.insert("name".to_string(), Value::String(name));
        }
        Ok(self.invoker.invoke(HelloTool::NAME, &arguments).await?)
    }
}

/// Build the authentication policy described by `config`.
pub fn authenticator(config: &AuthConfig) -> Authenticator {
    if !config.required {
        tracing::info!("Auth: disabled");
        return Authenticator::Disabled;
    }

    let (keys, algorithms) = match &config.hmac_secret {
        Some(secret) => {
            tracing::info!("Auth: bearer token required (shared HS256 secret)");
            let keys: Arc<dyn KeySource> = Arc::new(StaticKeySource::hmac(secret.as_bytes()));
            (keys, vec![Algorithm::HS256])
        }
        None => {
            tracing::info!(jwks_url = %config.jwks_url, "Auth: bearer token required (issuer JWKS)");
            let keys: Arc<dyn KeySource> =
                Arc::new(JwksKeySource::with_ttl(&config.jwks_url, config.jwks_ttl));
            (keys, vec![Algorithm::RS256])
        }
    };

    let verifier = TokenVerifier::new(keys)
        .with_algorithms(algorithms)
        .with_issuers(config.issuers.clone());

    if !config.allowed_emails.is_empty() {
        tracing::info!(allowed = config.allowed_emails.len(), "Auth: caller allow-list active");
    }

    Authenticator::required(verifier, config.expected_audience.clone())
        .with_allowed_emails(config.allowed_emails.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_disabled_by_default() {
        let server = Server::from_config(&AuthConfig::default());
        assert!(!server.dispatcher().auth_required());
    }

    #[test]
    fn test_auth_required_with_secret() {
        let config = AuthConfig {
            required: true,
            hmac_secret: Some("s3cret".to_string()),
            ..AuthConfig::default()
        };
        assert!(Server::from_config(&config).dispatcher().auth_required());
    }

    #[tokio::test]
    async fn test_hello_through_invoker() {
        let server = Server::from_config(&AuthConfig::default());
        let v = server.hello(Some("Ada".into())).await.unwrap();
        assert_eq!(v["message"], "Hello, Ada!");
        let v = server.hello(None).await.unwrap();
        assert_eq!(v["message"], "Hello, World!");
    }
}
