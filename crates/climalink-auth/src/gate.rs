use chrono::{Duration, Utc};
use climalink_core::JwtSettings;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;

/// Identity carried by a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: i64,
    pub username: String,
}

impl Subject {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id
    pub sub: String,

    /// Username
    pub name: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct AuthGate {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    pub fn new(secret: impl AsRef<[u8]>, lifetime: Duration) -> Self {
        let secret = secret.as_ref();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    /// Build a gate from the `[jwt]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the lifetime does not fit a
    /// [`Duration`].
    pub fn from_settings(settings: &JwtSettings) -> Result<Self, AuthError> {
        let lifetime = Duration::try_seconds(settings.token_lifetime_secs).ok_or_else(|| {
            AuthError::Signing(format!(
                "token lifetime out of range: {}s",
                settings.token_lifetime_secs
            ))
        })?;
        Ok(Self::new(settings.secret.as_bytes(), lifetime))
    }

    /// Sign a token for `subject`, valid for the configured lifetime.
    pub fn issue(&self, subject: &Subject) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| AuthError::Signing("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: subject.id.to_string(),
            name: subject.username.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Check a presented credential.
    ///
    /// Accepts either the bare token or an `Authorization` header value of the
    /// form `Bearer <token>`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unauthenticated`] when nothing, only whitespace or a
    ///   bare `Bearer` scheme was presented
    /// - [`AuthError::InvalidToken`] when the signature, expiry or subject
    ///   does not check out
    pub fn verify(&self, presented: Option<&str>) -> Result<Subject, AuthError> {
        let token = presented
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .filter(|value| !value.eq_ignore_ascii_case("bearer"))
            .ok_or(AuthError::Unauthenticated)?;
        let token = extract_bearer_token(token).unwrap_or(token);

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "Rejected token");
            AuthError::InvalidToken(e.to_string())
        })?;

        let id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken(format!("bad subject: {}", data.claims.sub)))?;

        Ok(Subject {
            id,
            username: data.claims.name,
        })
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
