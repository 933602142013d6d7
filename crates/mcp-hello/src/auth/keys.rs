//! Signing-key retrieval for token verification.
//!
//! [`JwksKeySource`] fetches the issuer's published JWK set and caches it. A stale
//! cache keeps serving known keys while a single background task refreshes it, so
//! verification of already-cached keys never waits on the network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::DecodingKey;
use tokio::sync::{Mutex, RwLock};

use super::AuthError;

/// Google's published OIDC signing keys.
pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// How long a fetched key set is considered fresh.
pub const DEFAULT_JWKS_TTL: Duration = Duration::from_secs(3600);

/// An unknown `kid` only forces a refetch if the cache is at least this old.
const MIN_FORCED_REFRESH: Duration = Duration::from_secs(30);

/// After a failed fetch, no new fetch starts for this long.
const RETRY_BACKOFF: Duration = Duration::from_secs(30);

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Provides the key that verifies a token signed with key id `kid`.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError>;
}

/// A single shared HMAC secret. Intended for development and tests.
#[derive(Clone)]
pub struct StaticKeySource {
    key: DecodingKey,
}

impl StaticKeySource {
    pub fn hmac(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
        }
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn decoding_key(&self, _kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        Ok(self.key.clone())
    }
}

#[derive(Clone)]
struct CachedJwks {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

struct JwksInner {
    url: String,
    http: reqwest::Client,
    ttl: Duration,
    cache: RwLock<Option<CachedJwks>>,
    /// Set while a background refresh task exists.
    refreshing: AtomicBool,
    /// Held for the duration of every fetch. Stores when the last fetch failed.
    fetch_gate: Mutex<Option<Instant>>,
}

/// Remote JWK set, cached with a TTL.
#[derive(Clone)]
pub struct JwksKeySource {
    inner: Arc<JwksInner>,
}

impl JwksKeySource {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_ttl(url, DEFAULT_JWKS_TTL)
    }

    pub fn with_ttl(url: impl Into<String>, ttl: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(url, http, ttl)
    }

    pub fn with_client(url: impl Into<String>, http: reqwest::Client, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(JwksInner {
                url: url.into(),
                http,
                ttl,
                cache: RwLock::new(None),
                refreshing: AtomicBool::new(false),
                fetch_gate: Mutex::new(None),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    fn spawn_refresh(&self, seen: Instant) {
        if self
            .inner
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if let Err(e) = inner.refresh(Some(seen)).await {
                tracing::warn!(url = %inner.url, error = %e, "background signing key refresh failed");
            }
            inner.refreshing.store(false, Ordering::Release);
        });
    }
}

impl JwksInner {
    /// Replace the key set fetched at `seen` (`None`: nothing cached yet).
    ///
    /// One fetch runs at a time. Callers that queued behind it get its result
    /// instead of fetching again, and after a failed fetch no new one starts
    /// until [`RETRY_BACKOFF`] has passed.
    async fn refresh(&self, seen: Option<Instant>) -> Result<Arc<JwkSet>, AuthError> {
        let mut last_failure = self.fetch_gate.lock().await;

        if let Some(cached) = self.cache.read().await.as_ref() {
            if Some(cached.fetched_at) != seen {
                return Ok(Arc::clone(&cached.keys));
            }
        }

        if let Some(failed_at) = *last_failure {
            if failed_at.elapsed() < RETRY_BACKOFF {
                return Err(AuthError::KeysUnavailable(format!(
                    "last fetch from {} failed {}s ago",
                    self.url,
                    failed_at.elapsed().as_secs()
                )));
            }
        }

        match self.fetch().await {
            Ok(keys) => {
                *last_failure = None;
                *self.cache.write().await = Some(CachedJwks {
                    keys: Arc::clone(&keys),
                    fetched_at: Instant::now(),
                });
                tracing::debug!(url = %self.url, keys = keys.keys.len(), "refreshed signing keys");
                Ok(keys)
            }
            Err(e) => {
                *last_failure = Some(Instant::now());
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<Arc<JwkSet>, AuthError> {
        let unavailable = |e: reqwest::Error| AuthError::KeysUnavailable(e.to_string());

        let keys: JwkSet = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)?;

        Ok(Arc::new(keys))
    }
}

fn select<'a>(keys: &'a JwkSet, kid: Option<&str>) -> Option<&'a Jwk> {
    match kid {
        Some(kid) => keys.find(kid),
        None => keys.keys.first(),
    }
}

fn to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    DecodingKey::from_jwk(jwk).map_err(AuthError::invalid)
}

fn unknown_kid(kid: Option<&str>) -> AuthError {
    AuthError::invalid(format!("no signing key for kid {}", kid.unwrap_or("<none>")))
}

#[async_trait]
impl KeySource for JwksKeySource {
    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        let cached = self.inner.cache.read().await.clone();

        if let Some(cached) = &cached {
            if let Some(jwk) = select(&cached.keys, kid) {
                if cached.fetched_at.elapsed() >= self.inner.ttl {
                    self.spawn_refresh(cached.fetched_at);
                }
                return to_decoding_key(jwk);
            }
            if cached.fetched_at.elapsed() < MIN_FORCED_REFRESH {
                return Err(unknown_kid(kid));
            }
        }

        let keys = self
            .inner
            .refresh(cached.as_ref().map(|c| c.fetched_at))
            .await?;
        let jwk = select(&keys, kid).ok_or_else(|| unknown_kid(kid))?;
        to_decoding_key(jwk)
    }
}
