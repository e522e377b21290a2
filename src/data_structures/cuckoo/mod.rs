// Copyright (c) 2025 Kiai Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Cuckoo exact table for blacklisted keys.
//!
//! The second stage of reputation classification. Every key the pre-filter
//! lets through is confirmed or rejected here with exactly two probes.
//!
//! # Features
//!
//! - Two arrays, one candidate slot per key in each.
//! - Bounded displacement chains that undo themselves on failure.
//! - All-or-nothing growth: a rehash commits only a complete layout.
//! - Per-key first/last seen timestamps that survive rehashing.
//!
//! # Example
//!
//! ```
//! use kiai_lib::data_structures::cuckoo::{CuckooConfig, CuckooTable};
//!
//! let config = CuckooConfig::new().with_initial_capacity(64);
//! let mut table = CuckooTable::with_config(config).unwrap();
//!
//! for key in 0..1_000u128 {
//!     table.insert(key, 1).unwrap();
//! }
//!
//! assert_eq!(table.len(), 1_000);
//! assert!(table.capacity() >= 1_000);
//! assert!(table.contains_key(999));
//! ```

// Module declarations
mod config;
mod entry;
mod error;
mod hash;
mod table;

// Re-exports
pub use config::{CuckooConfig, MAX_REHASH_ATTEMPTS};
pub use entry::{ReputationEntry, Timestamp};
pub use error::{CuckooError, Result};
pub use table::{CuckooTable, InsertOutcome, RehashEvent};
