//! Identity claims decoded from a verified token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Who is calling. Lives for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityClaims {
    pub subject: String,
    pub issuer: String,
    pub audience: Vec<String>,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl IdentityClaims {
    /// Whether `expected` is among the token's audiences.
    pub fn has_audience(&self, expected: &str) -> bool {
        self.audience.iter().any(|a| a == expected)
    }
}

/// `aud` may be a single string or an array of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Claims exactly as they appear in the token payload.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawClaims {
    pub sub: String,
    pub iss: String,
    #[serde(default)]
    pub aud: Option<OneOrMany>,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
}

impl TryFrom<RawClaims> for IdentityClaims {
    type Error = AuthError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let expires_at = DateTime::<Utc>::from_timestamp(raw.exp, 0)
            .ok_or_else(|| AuthError::invalid(format!("exp out of range: {}", raw.exp)))?;
        let audience = match raw.aud {
            None => Vec::new(),
            Some(OneOrMany::One(a)) => vec![a],
            Some(OneOrMany::Many(a)) => a,
        };
        Ok(Self {
            subject: raw.sub,
            issuer: raw.iss,
            audience,
            email: raw.email,
            expires_at,
        })
    }
}
