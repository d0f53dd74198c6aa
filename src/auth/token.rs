//! Signed, time-bounded identity tokens.
//!
//! Tokens are self-contained HS256 JWTs. Verification never consults the
//! store: within its validity window the token is the sole source of truth
//! for the caller's identity, and there is no revocation.

use std::env;
use std::fmt;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::store::User;
use crate::types::UserId;

/// Header carrying the token on protected requests.
pub const DEFAULT_TOKEN_HEADER: &str = "x-access-token";

/// Validity window of an issued token.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 300;

/// Token configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Symmetric HS256 signing key
    pub signing_key: String,
    /// Header name for the access token
    pub token_header: String,
    /// Token lifetime in minutes
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_key: env::var("TASKS_SIGNING_KEY").unwrap_or_default(),
            token_header: env::var("TASKS_TOKEN_HEADER")
                .unwrap_or_else(|_| DEFAULT_TOKEN_HEADER.to_string()),
            token_ttl_minutes: env::var("TASKS_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES),
        }
    }
}

impl AuthConfig {
    /// Config with an explicit key and default header/lifetime.
    pub fn with_signing_key(signing_key: impl Into<String>) -> Self {
        Self {
            signing_key: signing_key.into(),
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
        }
    }
}

// The signing key must never end up in logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_key", &"<redacted>")
            .field("token_header", &self.token_header)
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .finish()
    }
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No token on a protected request
    MissingToken,
    /// Bad signature, malformed encoding, or expired
    InvalidToken(String),
    /// Token could not be signed
    Signing(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "access token is missing"),
            Self::InvalidToken(msg) => write!(f, "access token is invalid: {}", msg),
            Self::Signing(msg) => write!(f, "failed to sign access token: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Claims embedded in every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    /// Expiration time (Unix seconds)
    pub exp: i64,
}

/// A freshly issued token and its expiration instant.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Issues and verifies access tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl TokenService {
    /// Create a token service from configuration.
    pub fn new(config: &AuthConfig) -> anyhow::Result<Self> {
        if config.signing_key.is_empty() {
            anyhow::bail!("signing key must not be empty");
        }
        if config.token_ttl_minutes <= 0 {
            anyhow::bail!("token lifetime must be positive");
        }

        let ttl_seconds = config
            .token_ttl_minutes
            .checked_mul(60)
            .ok_or_else(|| anyhow::anyhow!("token lifetime is too large"))?;

        let key = config.signing_key.as_bytes();

        // Expiry is checked by hand against an explicit clock, with no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            validation,
            ttl_seconds,
        })
    }

    /// Issue a token for `user`, valid from now.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        self.issue_at(user, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (Unix seconds).
    pub fn issue_at(&self, user: &User, now: i64) -> Result<IssuedToken, AuthError> {
        let expires_at = now + self.ttl_seconds;
        let claims = TokenClaims {
            user_id: user.user_id,
            email: user.email.clone(),
            name: user.name.clone(),
            exp: expires_at,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a token as if the current time were `now` (Unix seconds).
    ///
    /// Valid only when the signature checks out and `now < exp`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<TokenClaims, AuthError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let claims = data.claims;
        if now >= claims.exp {
            return Err(AuthError::InvalidToken("token expired".to_string()));
        }

        Ok(claims)
    }

    /// Token lifetime in seconds.
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }
}
