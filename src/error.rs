//! Error taxonomy shared by the stores, the account service and the HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::response::ApiResponse;
use crate::auth::AuthError;

/// Errors surfaced to callers of the service.
///
/// Every failure is scoped to a single request. Storage failures keep their
/// source for logging but only the context string is ever sent to a client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Client-supplied data fails a precondition.
    #[error("{0}")]
    Validation(String),

    /// Missing/invalid/expired token, or bad credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Duplicate unique key.
    #[error("{0}")]
    Conflict(String),

    /// Entity absent, or not owned by the caller.
    #[error("{0}")]
    NotFound(String),

    /// The store failed for reasons unrelated to business rules.
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for store and service operations.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Storage {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Top-level message of the response envelope.
    fn envelope_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid request",
            Self::Unauthorized(_) => "UNAUTHORIZED ACCESS",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not found",
            Self::Storage { .. } => "internal server error",
        }
    }

    /// The single human-readable string placed in `errors`.
    fn public_detail(&self) -> String {
        match self {
            Self::Storage { context, .. } => context.clone(),
            other => other.to_string(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Storage { context, source } = &self {
            tracing::error!(error = %source, "{}", context);
        }

        let body = ApiResponse::<()>::failure(self.envelope_message(), vec![self.public_detail()]);
        (self.status_code(), Json(body)).into_response()
    }
}

/// Wrap store failures with a short context, like `anyhow::Context`.
pub trait StorageContext<T> {
    fn storage_context(self, context: &str) -> AppResult<T>;
}

impl<T, E> StorageContext<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn storage_context(self, context: &str) -> AppResult<T> {
        self.map_err(|e| AppError::storage(context, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::storage("failed", anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_detail_hides_source() {
        let err = AppError::storage("failed to get task", anyhow::anyhow!("connection reset"));
        assert_eq!(err.public_detail(), "failed to get task");
        assert_eq!(err.to_string(), "failed to get task: connection reset");
    }

    #[test]
    fn test_storage_context_wraps_error() {
        let res: Result<(), std::io::Error> = Err(std::io::Error::other("disk"));
        let err = res.storage_context("failed to add task").unwrap_err();
        assert!(matches!(err, AppError::Storage { ref context, .. } if context == "failed to add task"));
    }

    #[test]
    fn test_auth_error_becomes_unauthorized() {
        let err: AppError = AuthError::MissingToken.into();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
