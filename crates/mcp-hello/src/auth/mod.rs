//! Bearer-token identity verification for inbound requests.

pub mod claims;
pub mod keys;
pub mod verifier;

pub use claims::IdentityClaims;
pub use keys::{JwksKeySource, KeySource, StaticKeySource, GOOGLE_JWKS_URL};
pub use verifier::{bearer_token, TokenVerifier, GOOGLE_ISSUERS};

/// Why a request could not be authenticated.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing or invalid authentication token")]
    MissingToken,

    #[error("Invalid token: {reason}")]
    InvalidToken { reason: String },

    #[error("Invalid token audience: expected {expected}, got {actual}")]
    AudienceMismatch { expected: String, actual: String },

    #[error("Signing keys unavailable: {0}")]
    KeysUnavailable(String),

    /// Authenticated, but not on the caller allow-list.
    #[error("Access denied for caller: {}", .email.as_deref().unwrap_or("<no email>"))]
    Forbidden { email: Option<String> },
}

impl AuthError {
    pub fn invalid(reason: impl std::fmt::Display) -> Self {
        AuthError::InvalidToken {
            reason: reason.to_string(),
        }
    }
}

/// Request authentication policy, fixed at startup.
pub enum Authenticator {
    /// Every request proceeds unauthenticated.
    Disabled,
    /// Every protected request must carry a verifiable bearer token.
    Required {
        verifier: TokenVerifier,
        /// Empty means the audience claim is not checked.
        expected_audience: String,
        /// Empty admits every verified caller.
        allowed_emails: Vec<String>,
    },
}

impl Authenticator {
    pub fn required(verifier: TokenVerifier, expected_audience: impl Into<String>) -> Self {
        let expected_audience = expected_audience.into();
        if expected_audience.is_empty() {
            tracing::warn!("Auth: no expected audience configured, audience claim will not be checked");
        }
        Authenticator::Required {
            verifier,
            expected_audience,
            allowed_emails: Vec::new(),
        }
    }

    /// Only admit verified callers whose `email` claim is listed (case-insensitive).
    /// No effect on [`Authenticator::Disabled`].
    pub fn with_allowed_emails(mut self, emails: Vec<String>) -> Self {
        if let Authenticator::Required { allowed_emails, .. } = &mut self {
            *allowed_emails = emails;
        }
        self
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Authenticator::Required { .. })
    }

    /// Verify the raw `Authorization` header value.
    ///
    /// Returns `Ok(None)` when authentication is disabled.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<Option<IdentityClaims>, AuthError> {
        match self {
            Authenticator::Disabled => Ok(None),
            Authenticator::Required {
                verifier,
                expected_audience,
                allowed_emails,
            } => {
                let claims = verifier.verify(authorization, expected_audience).await?;
                if !allowed_emails.is_empty() && !is_allowed(allowed_emails, claims.email.as_deref())
                {
                    return Err(AuthError::Forbidden {
                        email: claims.email,
                    });
                }
                Ok(Some(claims))
            }
        }
    }
}

fn is_allowed(allowed: &[String], email: Option<&str>) -> bool {
    email.is_some_and(|email| allowed.iter().any(|a| a.eq_ignore_ascii_case(email)))
}
