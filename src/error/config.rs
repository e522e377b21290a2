//! Configuration error module.
//!
//! Errors raised while layering, deserializing and validating [`KiaiConfig`](crate::config::KiaiConfig).

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The configuration sources could not be merged or deserialized.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// A cross-field rule or enumerated value was violated.
    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    /// A numeric value lies outside its valid range.
    #[error("Configuration value {key} is out of valid range: {message}")]
    ValueOutOfRange {
        /// Dotted path of the offending key
        key: String,
        /// Description of the valid range
        message: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::ValueOutOfRange`].
    pub fn out_of_range(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValueOutOfRange {
            key: key.into(),
            message: message.into(),
        }
    }
}
