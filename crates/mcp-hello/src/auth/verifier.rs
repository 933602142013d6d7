//! Bearer token verification against an OIDC issuer's signing keys.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, Validation};

use super::claims::{IdentityClaims, RawClaims};
use super::keys::KeySource;
use super::AuthError;

/// Issuers Google uses for ID tokens.
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Clock skew tolerated on `exp`, in seconds.
const DEFAULT_LEEWAY_SECS: u64 = 60;

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// # Errors
///
/// Returns [`AuthError::MissingToken`] if the header is absent, uses another
/// scheme, or carries an empty token.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    authorization
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Verifies signed identity tokens and extracts their claims.
pub struct TokenVerifier {
    keys: Arc<dyn KeySource>,
    issuers: Vec<String>,
    algorithms: Vec<Algorithm>,
    leeway: u64,
}

impl TokenVerifier {
    /// Verifier accepting RS256 tokens from Google's issuers.
    pub fn new(keys: Arc<dyn KeySource>) -> Self {
        Self {
            keys,
            issuers: GOOGLE_ISSUERS.iter().map(|s| s.to_string()).collect(),
            algorithms: vec![Algorithm::RS256],
            leeway: DEFAULT_LEEWAY_SECS,
        }
    }

    /// Accepted `iss` values. An empty list rejects every token.
    pub fn with_issuers(mut self, issuers: Vec<String>) -> Self {
        self.issuers = issuers;
        self
    }

    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway = leeway_secs;
        self
    }

    pub fn issuers(&self) -> &[String] {
        &self.issuers
    }

    /// Verify the raw `Authorization` header value.
    ///
    /// When `expected_audience` is empty the audience claim is not checked.
    pub async fn verify(
        &self,
        authorization: Option<&str>,
        expected_audience: &str,
    ) -> Result<IdentityClaims, AuthError> {
        let token = bearer_token(authorization)?;
        let claims = self.decode(token).await?;

        if !expected_audience.is_empty() && !claims.has_audience(expected_audience) {
            return Err(AuthError::AudienceMismatch {
                expected: expected_audience.to_string(),
                actual: claims.audience.join(","),
            });
        }

        tracing::info!(
            email = claims.email.as_deref().unwrap_or("-"),
            subject = %claims.subject,
            issuer = %claims.issuer,
            audience = %claims.audience.join(","),
            "caller authenticated"
        );

        Ok(claims)
    }

    async fn decode(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        if self.issuers.is_empty() {
            return Err(AuthError::invalid("no trusted issuers configured"));
        }

        let header = jsonwebtoken::decode_header(token).map_err(AuthError::invalid)?;
        if !self.algorithms.contains(&header.alg) {
            return Err(AuthError::invalid(format!(
                "algorithm {:?} not accepted",
                header.alg
            )));
        }

        let key = self.keys.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.leeway;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.set_issuer(self.issuers.as_slice());

        let data = jsonwebtoken::decode::<RawClaims>(token, &key, &validation)
            .map_err(AuthError::invalid)?;
        IdentityClaims::try_from(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticKeySource;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::{json, Value};

    const SECRET: &[u8] = b"unit-test-secret";
    const ISSUER: &str = "https://issuer.test";

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(Arc::new(StaticKeySource::hmac(SECRET)))
            .with_algorithms(vec![Algorithm::HS256])
            .with_issuers(vec![ISSUER.to_string()])
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn mint(claims: Value) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn valid_claims() -> Value {
        json!({
            "sub": "1234",
            "iss": ISSUER,
            "aud": "https://svc.example",
            "email": "caller@example.com",
            "exp": now() + 600
        })
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(None), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("Basic abc")), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("Bearer ")), Err(AuthError::MissingToken));
        assert_eq!(bearer_token(Some("bearer abc")), Err(AuthError::MissingToken));
    }

    #[tokio::test]
    async fn test_valid_token() {
        let header = format!("Bearer {}", mint(valid_claims()));
        let claims = verifier()
            .verify(Some(&header), "https://svc.example")
            .await
            .unwrap();
        assert_eq!(claims.subject, "1234");
        assert_eq!(claims.issuer, ISSUER);
        assert_eq!(claims.email.as_deref(), Some("caller@example.com"));
    }

    #[tokio::test]
    async fn test_audience_mismatch() {
        let header = format!("Bearer {}", mint(valid_claims()));
        let err = verifier()
            .verify(Some(&header), "https://other.example")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AudienceMismatch { .. }));
    }

    #[tokio::test]
    async fn test_empty_audience_skips_check() {
        let header = format!("Bearer {}", mint(valid_claims()));
        assert!(verifier().verify(Some(&header), "").await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_token() {
        let mut claims = valid_claims();
        claims["exp"] = json!(now() - 3600);
        let header = format!("Bearer {}", mint(claims));
        let err = verifier().verify(Some(&header), "").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
    }

    #[tokio::test]
    async fn test_wrong_issuer() {
        let mut claims = valid_claims();
        claims["iss"] = json!("https://evil.example");
        let header = format!("Bearer {}", mint(claims));
        let err = verifier().verify(Some(&header), "").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
    }

    #[tokio::test]
    async fn test_empty_issuer_list_rejects_everything() {
        let mut claims = valid_claims();
        claims["iss"] = json!("https://evil.example");
        let header = format!("Bearer {}", mint(claims));
        let err = verifier()
            .with_issuers(Vec::new())
            .verify(Some(&header), "")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::invalid("no trusted issuers configured"));
    }

    #[tokio::test]
    async fn test_bad_signature() {
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &valid_claims(),
            &EncodingKey::from_secret(b"another-secret"),
        )
        .unwrap();
        let header = format!("Bearer {token}");
        let err = verifier().verify(Some(&header), "").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
    }

    #[tokio::test]
    async fn test_disallowed_algorithm() {
        let header = format!("Bearer {}", mint(valid_claims()));
        let rs256_only = TokenVerifier::new(Arc::new(StaticKeySource::hmac(SECRET)));
        let err = rs256_only.verify(Some(&header), "").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
    }

    #[tokio::test]
    async fn test_garbage_token() {
        let err = verifier()
            .verify(Some("Bearer not-a-jwt"), "")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
    }
}
