//! Generic response envelope: `{message, data?, errors?}`.

use serde::Serialize;

/// Envelope returned by every endpoint.
///
/// `errors` is always a list of human-readable strings, never structured codes.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            errors: None,
        }
    }

    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            errors: None,
        }
    }

    pub fn failure(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            errors: Some(errors),
        }
    }
}

/// Payload of a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub token: String,
    pub expires_at: i64,
}
