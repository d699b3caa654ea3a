//! API error classification.

use gamebridge_core::CoreError;
use thiserror::Error;

/// Result type for handler methods.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced to the transport layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller's input was invalid; nothing was written.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The backend failed; transactional writes have been rolled back.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Internal(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::BadRequest(_))
    }

    /// Stable machine-readable error code for the JSON error body.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(message) => ApiError::BadRequest(message),
            CoreError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}
