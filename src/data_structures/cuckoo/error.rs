// Copyright (c) 2025 Kiai Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Error types for the cuckoo exact table.

/// Error types for cuckoo table operations
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum CuckooError {
    /// Growing the table still could not place every entry
    #[error("Cuckoo table capacity exhausted after {attempts} rehash attempts (last capacity {capacity})")]
    CapacityExhausted {
        /// Total slot count of the last attempted layout
        capacity: usize,
        /// Number of rehash attempts made
        attempts: usize,
    },

    /// Configuration error
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for cuckoo table operations
pub type Result<T> = std::result::Result<T, CuckooError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CuckooError::CapacityExhausted {
            capacity: 4_096,
            attempts: 2,
        };
        assert_eq!(
            err.to_string(),
            "Cuckoo table capacity exhausted after 2 rehash attempts (last capacity 4096)"
        );
    }
}
