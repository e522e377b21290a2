// Copyright (c) 2025 Kiai Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Bloom pre-filter for blacklist membership.
//!
//! The first stage of reputation classification. It answers "definitely not
//! blacklisted" for the bulk of clean traffic without touching the exact
//! store, and "possibly blacklisted" for everything else.
//!
//! # Features
//!
//! - Optimal sizing from a target capacity and false positive rate.
//! - Double hashing: two base hashes produce all k positions.
//! - Live false positive estimate used to decide when to rebuild.
//! - Insert-only; rebuilding is the only way to shrink the false positive rate.
//!
//! # Example
//!
//! ```
//! use kiai_lib::data_structures::bloom::{optimal_params, BloomFilter};
//!
//! let params = optimal_params(10_000, 0.01).unwrap();
//! assert_eq!(params.hash_count, 7);
//!
//! let mut filter = BloomFilter::new(params);
//! filter.insert(0xc0a8_0001);
//!
//! assert!(filter.might_contain(0xc0a8_0001));
//! ```

// Module declarations
mod error;
mod filter;
mod hash;
mod params;

// Re-exports
pub use error::{BloomError, Result};
pub use filter::BloomFilter;
pub use params::{estimate_fpr, optimal_params, BloomParams};
