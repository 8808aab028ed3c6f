use thiserror::Error;

use crate::operation_state::Operation;

/// A required field was missing, empty or not positive. Raised before any
/// gateway call, so nothing has changed when the caller sees it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{0} must be positive")]
    NotPositive(&'static str),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("{operation} failed: {reason}")]
    Gateway {
        operation: Operation,
        reason: String,
    },
    #[error("{0} is already in progress")]
    OperationInFlight(Operation),
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;

/// Rejects empty or whitespace-only text.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text_rejects_whitespace() {
        assert_eq!(require_text("food name", "  \t"), Err(ValidationError::Empty("food name")));
        assert!(require_text("food name", "사과").is_ok());
    }

    #[test]
    fn test_gateway_error_names_operation() {
        let err = TrackerError::Gateway {
            operation: Operation::Recommendation,
            reason: "503".to_string(),
        };
        assert_eq!(err.to_string(), "recommendation failed: 503");
    }
}
