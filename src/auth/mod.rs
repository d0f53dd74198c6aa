//! Authentication and request authorization.
//!
//! - **Token service**: issues and verifies stateless HS256 access tokens
//! - **Auth gate**: middleware that turns a token header into a [`UserContext`]
//! - **Passwords**: Argon2 hashing and verification
//!
//! ## Security Model
//!
//! - Tokens carry the caller's id, email and name; verification never touches
//!   the store, so a token stays valid until it expires
//! - All task queries are scoped by the `UserContext` user id
//! - Tokens, passwords and hashes are never logged

mod context;
pub mod gate;
pub mod password;
mod token;

pub use context::UserContext;
pub use gate::{authenticate, require_auth};
pub use token::{
    AuthConfig, AuthError, DEFAULT_TOKEN_HEADER, DEFAULT_TOKEN_TTL_MINUTES, IssuedToken,
    TokenClaims, TokenService,
};
