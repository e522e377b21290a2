// Copyright (c) 2025 Kiai Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Error types for the bloom pre-filter.

/// Errors that can occur while sizing or building a bloom filter.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum BloomError {
    /// Sizing inputs are outside their valid domain
    #[error("Invalid bloom filter parameters: {0}")]
    InvalidParameters(String),
}

/// Result type for bloom filter operations
pub type Result<T> = std::result::Result<T, BloomError>;
