//! Data structures behind reputation classification.
//!
//! Both structures take normalized 128-bit keys and know nothing about
//! address formats. They are single-writer; callers that share them across
//! threads wrap them in a lock.

pub mod bloom;
pub mod cuckoo;

// Re-export common data structures
pub use bloom::{BloomFilter, BloomParams};
pub use cuckoo::{CuckooTable, InsertOutcome, ReputationEntry};
