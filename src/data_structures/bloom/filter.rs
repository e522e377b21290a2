// Copyright (c) 2025 Kiai Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Main implementation of the bloom pre-filter.

use crate::data_structures::bloom::error::Result;
use crate::data_structures::bloom::hash::{DoubleHasher, MultiHasher};
use crate::data_structures::bloom::params::{estimate_fpr, optimal_params, BloomParams};

/// An insert-only bloom filter over 128-bit keys.
///
/// A negative answer from [`might_contain`](Self::might_contain) is definite,
/// a positive answer means "possibly present". There is no delete; the only
/// way to shed stale bits is to build a new filter.
///
/// Mutation takes `&mut self`, so inserts can never interleave with reads or
/// FPR estimates on the same filter. Shared use goes through an owner that
/// holds the filter behind one exclusive lock.
///
/// # Examples
///
/// ```
/// use kiai_lib::data_structures::bloom::BloomFilter;
///
/// let mut filter = BloomFilter::with_capacity(1_000, 0.01).unwrap();
/// filter.insert(0x0a00_0001);
///
/// assert!(filter.might_contain(0x0a00_0001));
/// assert!(filter.estimated_fpr() < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct BloomFilter {
    /// Bit count and hash count
    params: BloomParams,

    /// Bit array packed into 64-bit words
    words: Vec<u64>,

    /// Insert calls since construction
    inserted: usize,

    /// Hasher for computing bit positions
    hasher: DoubleHasher,
}

impl BloomFilter {
    /// Create an empty filter with explicit parameters.
    pub fn new(params: BloomParams) -> Self {
        let word_count = params.m_bits.div_ceil(64);
        Self {
            params,
            words: vec![0u64; word_count],
            inserted: 0,
            hasher: DoubleHasher::new(),
        }
    }

    /// Create an empty filter sized for `expected_items` at `target_fpr`.
    pub fn with_capacity(expected_items: usize, target_fpr: f64) -> Result<Self> {
        Ok(Self::new(optimal_params(expected_items, target_fpr)?))
    }

    /// Set all k bit positions of `key`.
    ///
    /// Idempotent on the bit array. Returns `true` if any bit changed.
    pub fn insert(&mut self, key: u128) -> bool {
        let positions =
            self.hasher
                .compute_positions(key, self.params.hash_count, self.params.m_bits);

        let mut changed = false;
        for bit_pos in positions {
            let word = &mut self.words[bit_pos / 64];
            let mask = 1u64 << (bit_pos % 64);
            if *word & mask == 0 {
                *word |= mask;
                changed = true;
            }
        }

        self.inserted += 1;
        changed
    }

    /// Returns `false` if `key` was definitely never inserted.
    pub fn might_contain(&self, key: u128) -> bool {
        self.hasher
            .compute_positions(key, self.params.hash_count, self.params.m_bits)
            .into_iter()
            .all(|bit_pos| self.words[bit_pos / 64] & (1u64 << (bit_pos % 64)) != 0)
    }

    /// Estimated false positive rate from the live insert count.
    pub fn estimated_fpr(&self) -> f64 {
        estimate_fpr(self.params.m_bits, self.inserted, self.params.hash_count)
    }

    /// Estimated false positive rate if `additional` more keys were inserted.
    pub fn projected_fpr(&self, additional: usize) -> f64 {
        estimate_fpr(
            self.params.m_bits,
            self.inserted.saturating_add(additional),
            self.params.hash_count,
        )
    }

    /// Fraction of bits currently set.
    pub fn fill_ratio(&self) -> f64 {
        let set_bits: u64 = self.words.iter().map(|w| u64::from(w.count_ones())).sum();
        set_bits as f64 / self.params.m_bits as f64
    }

    /// Sizing parameters of this filter.
    pub fn params(&self) -> BloomParams {
        self.params
    }

    /// Number of bits (m).
    pub fn m_bits(&self) -> usize {
        self.params.m_bits
    }

    /// Number of hash positions per key (k).
    pub fn hash_count(&self) -> usize {
        self.params.hash_count
    }

    /// Insert calls since construction.
    pub fn inserted_count(&self) -> usize {
        self.inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bloom_filter_basic() {
        let mut filter = BloomFilter::with_capacity(1_000, 0.01).unwrap();

        filter.insert(1);
        filter.insert(2);

        assert!(filter.might_contain(1));
        assert!(filter.might_contain(2));
        assert!(!filter.might_contain(3));
        assert_eq!(filter.inserted_count(), 2);
    }

    #[test]
    fn test_insert_is_idempotent_on_bits() {
        let mut filter = BloomFilter::with_capacity(100, 0.01).unwrap();

        assert!(filter.insert(42));
        let ratio = filter.fill_ratio();
        assert!(!filter.insert(42));
        assert_eq!(filter.fill_ratio(), ratio);
    }

    #[test]
    fn test_bloom_filter_fill_ratio() {
        let mut filter = BloomFilter::with_capacity(10_000, 0.01).unwrap();
        assert_eq!(filter.fill_ratio(), 0.0);

        for i in 0..1_000u128 {
            filter.insert(i);
        }

        assert!(filter.fill_ratio() > 0.0);
        assert!(filter.fill_ratio() < 1.0);
    }

    #[test]
    fn test_estimated_fpr_tracks_inserts() {
        let mut filter = BloomFilter::with_capacity(1_000, 0.01).unwrap();
        assert_eq!(filter.estimated_fpr(), 0.0);

        for i in 0..500u128 {
            filter.insert(i);
        }
        let half = filter.estimated_fpr();

        for i in 500..2_000u128 {
            filter.insert(i);
        }
        let over = filter.estimated_fpr();

        assert!(half < 0.01);
        assert!(over > 0.01);
        assert!(filter.projected_fpr(1_000) > over);
    }

    #[test]
    fn test_no_false_negatives() {
        let mut filter = BloomFilter::with_capacity(5_000, 0.01).unwrap();
        for i in 0..5_000u128 {
            filter.insert(i * 7_919);
        }
        for i in 0..5_000u128 {
            assert!(filter.might_contain(i * 7_919));
        }
    }

    #[test]
    fn test_false_positive_rate() {
        let expected_items = 10_000u128;
        let target_fp_rate = 0.01;

        let mut filter = BloomFilter::with_capacity(expected_items as usize, target_fp_rate).unwrap();
        for i in 0..expected_items {
            filter.insert(i);
        }

        let mut false_positives = 0;
        for i in expected_items..(expected_items * 2) {
            if filter.might_contain(i) {
                false_positives += 1;
            }
        }

        let actual_fp_rate = false_positives as f64 / expected_items as f64;

        // Allow a factor of 2x since there's statistical variation
        assert!(actual_fp_rate < target_fp_rate * 2.0);
    }

    #[test]
    fn test_explicit_params() {
        let filter = BloomFilter::new(BloomParams::new(100, 3).unwrap());
        assert_eq!(filter.m_bits(), 100);
        assert_eq!(filter.hash_count(), 3);
        assert_eq!(filter.params(), BloomParams::new(100, 3).unwrap());
    }
}
