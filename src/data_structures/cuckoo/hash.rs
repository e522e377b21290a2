// Copyright (c) 2025 Kiai Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Hash functions for the cuckoo exact table.
//!
//! Each key has exactly one candidate slot per array. The two functions use
//! different seeds so a collision in one array says nothing about the other.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Seeds for the left and right array hash functions.
#[allow(clippy::unreadable_literal)]
const HASH_SEEDS: [u64; 2] = [0x517cc1b727220a95, 0x83588256c732eb1f];

/// Which of the two slot arrays a position refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    /// Array addressed by h1
    Left,
    /// Array addressed by h2
    Right,
}

impl Side {
    /// The alternate array, where an evicted entry is carried next.
    pub fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    fn seed(self) -> u64 {
        match self {
            Side::Left => HASH_SEEDS[0],
            Side::Right => HASH_SEEDS[1],
        }
    }
}

/// Computes a hash value for the given key with the specified seed.
pub(crate) fn hash_with_seed(key: u128, seed: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}

/// Maps keys to slot indices for the current per-array capacity.
///
/// A new hasher is built on every rehash so indices always match the live
/// capacity. Any non-zero capacity works; indices are reduced modulo it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CuckooHasher {
    side_capacity: usize,
}

impl CuckooHasher {
    /// Creates a hasher for arrays of `side_capacity` slots.
    pub fn new(side_capacity: usize) -> Self {
        debug_assert!(side_capacity > 0);
        Self { side_capacity }
    }

    /// Slot index of `key` in the given array.
    pub fn index(&self, side: Side, key: u128) -> usize {
        (hash_with_seed(key, side.seed()) % self.side_capacity as u64) as usize
    }

    /// Per-array capacity.
    pub fn side_capacity(&self) -> usize {
        self.side_capacity
    }
}
