//! Domain error types
//!
//! Validation failures for day keys, goal values and sync payloads.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Day key is not a valid `YYYY-MM-DD` calendar date
    #[error("Invalid day key: {0}")]
    InvalidDayKey(String),

    /// Step count is negative or out of range
    #[error("Invalid step count: {0}")]
    InvalidSteps(String),

    /// Goal value is negative or out of range
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    /// Payload is not a JSON object or a frame is malformed
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidDayKey("2024-13-01".to_string());
        assert_eq!(err.to_string(), "Invalid day key: 2024-13-01");

        let err = DomainError::InvalidSteps("-5".to_string());
        assert_eq!(err.to_string(), "Invalid step count: -5");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidGoal("x".to_string());
        let err2 = DomainError::InvalidGoal("x".to_string());
        let err3 = DomainError::InvalidPayload("x".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
