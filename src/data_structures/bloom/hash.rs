// Copyright (c) 2025 Kiai Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Bit position derivation for the bloom pre-filter.
//!
//! Two independent base hashes are computed once per key and combined by
//! double hashing: `position_i = (h1 + i * h2) mod m` for `i` in `[0, k)`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A trait for computing the k bit positions of a key.
pub(crate) trait MultiHasher {
    /// Compute `hash_count` bit positions in `[0, bit_count)` for `key`.
    fn compute_positions(&self, key: u128, hash_count: usize, bit_count: usize) -> Vec<usize>;
}

/// Double hasher built from FNV-1a and SipHash base values.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DoubleHasher;

impl DoubleHasher {
    /// Create a new double hasher.
    pub fn new() -> Self {
        Self
    }

    /// The two base hash values `(h1, h2)` for a key.
    pub fn base_hashes(&self, key: u128) -> (u64, u64) {
        (calculate_hash1(key), calculate_hash2(key))
    }
}

impl MultiHasher for DoubleHasher {
    fn compute_positions(&self, key: u128, hash_count: usize, bit_count: usize) -> Vec<usize> {
        let m = bit_count.max(1) as u128;
        let (h1, h2) = self.base_hashes(key);

        let h1 = h1 as u128 % m;
        // A zero step would collapse every probe onto h1.
        let h2 = match h2 as u128 % m {
            0 => 1,
            step => step,
        };

        (0..hash_count as u128)
            .map(|i| ((h1 + i * h2) % m) as usize)
            .collect()
    }
}

/// First base hash: FNV-1a followed by a 64-bit finalizer.
///
/// Zero-extended IPv4 keys carry most of their entropy in a few low bytes,
/// the finalizer spreads it across the whole word.
fn calculate_hash1(key: u128) -> u64 {
    let mut hasher = fnv::FnvHasher::default();
    key.hash(&mut hasher);
    mix64(hasher.finish())
}

/// Second base hash: SipHash through the std default hasher.
fn calculate_hash2(key: u128) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// MurmurHash3 fmix64.
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}
