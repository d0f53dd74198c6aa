//! Request-level auth gate for protected routes.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::api::AppState;
use crate::auth::context::UserContext;
use crate::auth::token::{AuthError, TokenService};
use crate::error::AppError;

/// Resolve the caller from the token header.
///
/// The only transition out of the unauthenticated state is a successful
/// [`TokenService::verify`].
pub fn authenticate(
    tokens: &TokenService,
    header: &HeaderName,
    headers: &HeaderMap,
) -> Result<UserContext, AuthError> {
    let token = headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    tokens.verify(token).map(UserContext::from)
}

/// Axum middleware: attach a [`UserContext`] or stop the request with 401.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match authenticate(state.tokens(), state.token_header(), request.headers()) {
        Ok(ctx) => {
            debug!(user_id = %ctx.user_id(), "request authenticated");
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(err) => {
            debug!(path = %request.uri().path(), reason = %err, "request rejected by auth gate");
            AppError::from(err).into_response()
        }
    }
}
