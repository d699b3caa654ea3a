//! Error types for the domain services.

use gamebridge_store::StoreError;
use thiserror::Error;

/// Result type for domain operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the domain services.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid caller input, rejected before any store access.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Store failure; transactional writes have been rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true if the error was caused by the caller's input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Returns the trimmed value, or a validation error naming `field` when it
/// is blank.
pub(crate) fn require_non_blank<'a>(value: &'a str, field: &str) -> CoreResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation(format!("{field} missing")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(CoreError::validation("xuid missing").is_validation());
        assert!(!CoreError::Store(StoreError::migration("boom")).is_validation());
    }

    #[test]
    fn non_blank_trims() {
        assert_eq!(require_non_blank("  srv1  ", "serverKey").unwrap(), "srv1");
        let err = require_non_blank("   ", "serverKey").unwrap_err();
        assert!(err.to_string().contains("serverKey missing"));
    }
}
