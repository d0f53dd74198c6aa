//! Verified caller identity, attached to each authenticated request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use crate::auth::token::TokenClaims;
use crate::error::AppError;
use crate::types::UserId;

/// User context derived from a verified access token.
///
/// Handlers read the caller's identity from here without re-verifying the
/// token. It is immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    user_id: UserId,
    email: String,
    display_name: String,
    /// Token expiration (Unix seconds)
    expires_at: i64,
}

impl UserContext {
    pub fn new(user_id: UserId, email: String, display_name: String, expires_at: i64) -> Self {
        Self {
            user_id,
            email,
            display_name,
            expires_at,
        }
    }

    /// Id of the authenticated user. Every ownership-scoped query uses this.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }
}

impl From<TokenClaims> for UserContext {
    fn from(claims: TokenClaims) -> Self {
        Self::new(claims.user_id, claims.email, claims.name, claims.exp)
    }
}

/// Handlers take `UserContext` as an argument; the auth gate must have run.
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserContext>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("access token is missing".to_string()))
    }
}
