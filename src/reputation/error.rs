//! Error types for the reputation manager.

use thiserror::Error;

use crate::data_structures::bloom::BloomError;
use crate::data_structures::cuckoo::CuckooError;

/// Result type alias for reputation operations.
pub type ReputationResult<T> = Result<T, ReputationError>;

/// Errors surfaced by the reputation manager.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReputationError {
    /// The input was not a dotted-decimal IPv4 address.
    #[error("Invalid address format: {0:?}")]
    InvalidFormat(String),

    /// The exact table could not place an entry even after growing.
    #[error("Exact table error: {0}")]
    CapacityExhausted(#[from] CuckooError),

    /// Filter sizing was asked for impossible parameters.
    #[error("Filter sizing error: {0}")]
    InvalidParameters(#[from] BloomError),

    /// The manager configuration failed validation.
    #[error("Invalid reputation configuration: {0}")]
    InvalidConfiguration(String),
}

impl ReputationError {
    /// Whether the error was caused by the caller's input rather than the
    /// state of the manager.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidFormat(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReputationError::InvalidFormat("10.0.0".to_string());
        assert_eq!(err.to_string(), "Invalid address format: \"10.0.0\"");
        assert!(err.is_input_error());

        let err: ReputationError = CuckooError::CapacityExhausted {
            capacity: 8,
            attempts: 2,
        }
        .into();
        assert!(!err.is_input_error());
        assert!(err.to_string().starts_with("Exact table error:"));
    }
}
