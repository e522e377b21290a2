// Copyright (c) 2025 Kiai Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Implementation of the cuckoo exact table.
//!
//! Two slot arrays of equal size, one candidate slot per key in each. Lookups
//! probe exactly two slots. Inserts displace residents along a bounded chain
//! and grow the table when the chain runs out.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::data_structures::cuckoo::config::{CuckooConfig, MAX_REHASH_ATTEMPTS};
use crate::data_structures::cuckoo::entry::{ReputationEntry, Timestamp};
use crate::data_structures::cuckoo::error::{CuckooError, Result};
use crate::data_structures::cuckoo::hash::{CuckooHasher, Side};

/// What an insert did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was new and now occupies a slot
    Inserted,
    /// The key was already present; only `last_seen` moved
    Refreshed,
}

/// Summary of a completed rehash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RehashEvent {
    /// Total slots before the rehash
    pub old_capacity: usize,
    /// Total slots after the rehash
    pub new_capacity: usize,
    /// Entries carried over
    pub entries: usize,
    /// Layouts tried before one held every entry
    pub attempts: usize,
}

/// The two slot arrays and their occupancy.
#[derive(Debug, Clone)]
struct Slots {
    left: Vec<Option<ReputationEntry>>,
    right: Vec<Option<ReputationEntry>>,
    hasher: CuckooHasher,
    len: usize,
}

impl Slots {
    fn new(side_capacity: usize) -> Self {
        Self {
            left: vec![None; side_capacity],
            right: vec![None; side_capacity],
            hasher: CuckooHasher::new(side_capacity),
            len: 0,
        }
    }

    fn side_capacity(&self) -> usize {
        self.hasher.side_capacity()
    }

    fn array(&self, side: Side) -> &[Option<ReputationEntry>] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn slot_mut(&mut self, side: Side, index: usize) -> &mut Option<ReputationEntry> {
        match side {
            Side::Left => &mut self.left[index],
            Side::Right => &mut self.right[index],
        }
    }

    /// Position of `key`, if stored. Occupancy alone is not a match.
    fn locate(&self, key: u128) -> Option<(Side, usize)> {
        [Side::Left, Side::Right].into_iter().find_map(|side| {
            let index = self.hasher.index(side, key);
            match &self.array(side)[index] {
                Some(entry) if entry.key == key => Some((side, index)),
                _ => None,
            }
        })
    }

    fn get(&self, key: u128) -> Option<&ReputationEntry> {
        let (side, index) = self.locate(key)?;
        self.array(side)[index].as_ref()
    }

    fn get_mut(&mut self, key: u128) -> Option<&mut ReputationEntry> {
        let (side, index) = self.locate(key)?;
        self.slot_mut(side, index).as_mut()
    }

    /// Place an entry whose key is not yet stored.
    ///
    /// Walks the displacement chain for at most `max_kicks` evictions. On
    /// success returns the number of evictions. On failure every swap is
    /// undone in reverse order, so the arrays are exactly as before the call,
    /// and the original entry is handed back.
    fn place(
        &mut self,
        entry: ReputationEntry,
        max_kicks: usize,
    ) -> std::result::Result<usize, ReputationEntry> {
        let mut carried = entry;
        let mut side = Side::Left;
        let mut path: Vec<(Side, usize)> = Vec::new();

        for kicks in 0..=max_kicks {
            let index = self.hasher.index(side, carried.key);
            let slot = self.slot_mut(side, index);

            if slot.is_none() {
                *slot = Some(carried);
                self.len += 1;
                return Ok(kicks);
            }
            if let Some(resident) = slot {
                std::mem::swap(resident, &mut carried);
            }
            path.push((side, index));
            side = side.other();
        }

        for &(side, index) in path.iter().rev() {
            if let Some(resident) = self.slot_mut(side, index) {
                std::mem::swap(resident, &mut carried);
            }
        }
        Err(carried)
    }

    /// A fresh layout of `side_capacity` holding every current entry plus
    /// `pending`, or `None` if some entry could not be placed.
    fn rebuilt(
        &self,
        side_capacity: usize,
        pending: Option<ReputationEntry>,
        max_kicks: usize,
    ) -> Option<Slots> {
        let mut fresh = Slots::new(side_capacity);
        for entry in self.iter().copied().chain(pending) {
            if fresh.place(entry, max_kicks).is_err() {
                return None;
            }
        }
        Some(fresh)
    }

    fn iter(&self) -> impl Iterator<Item = &ReputationEntry> {
        self.left.iter().chain(self.right.iter()).flatten()
    }
}

/// Exact store of blacklisted keys using two-choice cuckoo hashing.
///
/// Every stored key lives in exactly one of its two candidate slots, so a
/// lookup is two probes regardless of load. Inserts that cannot find room
/// within `max_kicks` evictions grow the table, and a rehash either commits a
/// complete new layout or leaves the old one untouched.
///
/// # Examples
///
/// ```
/// use kiai_lib::data_structures::cuckoo::{CuckooTable, InsertOutcome};
///
/// let mut table = CuckooTable::new();
/// assert_eq!(table.insert(0x0a00_0001, 100).unwrap(), InsertOutcome::Inserted);
/// assert_eq!(table.insert(0x0a00_0001, 200).unwrap(), InsertOutcome::Refreshed);
///
/// let entry = table.lookup(0x0a00_0001, 300).unwrap();
/// assert_eq!(entry.first_seen, 100);
/// assert_eq!(entry.last_seen, 300);
/// ```
#[derive(Debug, Clone)]
pub struct CuckooTable {
    /// Current layout
    slots: Slots,

    /// The configuration for the table
    config: CuckooConfig,

    /// Completed rehashes since construction
    rehash_count: u64,

    /// Evictions performed by successful displacement chains
    eviction_count: u64,
}

impl CuckooTable {
    /// Creates an empty table with default configuration.
    pub fn new() -> Self {
        Self::from_valid_config(CuckooConfig::default())
    }

    /// Creates an empty table with the specified configuration.
    pub fn with_config(config: CuckooConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: CuckooConfig) -> Self {
        Self {
            slots: Slots::new(config.side_capacity()),
            config,
            rehash_count: 0,
            eviction_count: 0,
        }
    }

    /// Insert a key seen at `now`.
    ///
    /// An already-present key only has its `last_seen` advanced. A new key is
    /// placed through the displacement chain; if the chain exceeds
    /// `max_kicks` the table grows by its growth factor and the insert is
    /// retried on the new layout.
    ///
    /// # Errors
    ///
    /// [`CuckooError::CapacityExhausted`] when two consecutive growth attempts
    /// could not place every entry. The table is left unchanged.
    pub fn insert(&mut self, key: u128, now: Timestamp) -> Result<InsertOutcome> {
        if let Some(entry) = self.slots.get_mut(key) {
            entry.observe(now);
            return Ok(InsertOutcome::Refreshed);
        }

        match self
            .slots
            .place(ReputationEntry::new(key, now), self.config.max_kicks)
        {
            Ok(kicks) => {
                self.eviction_count += kicks as u64;
                Ok(InsertOutcome::Inserted)
            }
            Err(homeless) => {
                debug!(
                    max_kicks = self.config.max_kicks,
                    capacity = self.capacity(),
                    "Displacement chain exhausted, growing cuckoo table"
                );
                self.grow(self.config.growth_factor, Some(homeless))?;
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    /// Find a key and record the hit by advancing its `last_seen` to `now`.
    ///
    /// Probes exactly two slots.
    pub fn lookup(&mut self, key: u128, now: Timestamp) -> Option<ReputationEntry> {
        let entry = self.slots.get_mut(key)?;
        entry.observe(now);
        Some(*entry)
    }

    /// Find a key without recording an observation.
    pub fn get(&self, key: u128) -> Option<&ReputationEntry> {
        self.slots.get(key)
    }

    /// Checks if the key exists in the table.
    pub fn contains_key(&self, key: u128) -> bool {
        self.slots.locate(key).is_some()
    }

    /// Grow to `growth_factor` times the current capacity and reinsert every
    /// entry by its own key.
    ///
    /// Timestamps are carried over verbatim. If the new layout cannot hold
    /// every entry the attempt is discarded and retried once at a larger
    /// capacity; a partially populated layout is never committed.
    pub fn rehash(&mut self, growth_factor: usize) -> Result<RehashEvent> {
        self.grow(growth_factor, None)
    }

    fn grow(
        &mut self,
        growth_factor: usize,
        pending: Option<ReputationEntry>,
    ) -> Result<RehashEvent> {
        if growth_factor < 2 {
            return Err(CuckooError::InvalidConfiguration(format!(
                "growth_factor must be at least 2, got {growth_factor}"
            )));
        }

        let old_capacity = self.capacity();
        let mut side_capacity = self.slots.side_capacity();

        for attempt in 1..=MAX_REHASH_ATTEMPTS {
            side_capacity = side_capacity
                .checked_mul(growth_factor)
                .ok_or(CuckooError::CapacityExhausted {
                    capacity: old_capacity,
                    attempts: attempt,
                })?;

            debug!(attempt, side_capacity, entries = self.len(), "Attempting cuckoo rehash");

            if let Some(fresh) = self
                .slots
                .rebuilt(side_capacity, pending, self.config.max_kicks)
            {
                self.slots = fresh;
                self.rehash_count += 1;

                let event = RehashEvent {
                    old_capacity,
                    new_capacity: self.capacity(),
                    entries: self.len(),
                    attempts: attempt,
                };
                info!(
                    old_capacity = event.old_capacity,
                    new_capacity = event.new_capacity,
                    entries = event.entries,
                    load_factor = self.load_factor(),
                    "Cuckoo table rehashed"
                );
                return Ok(event);
            }
        }

        let capacity = side_capacity.saturating_mul(2);
        warn!(
            capacity,
            attempts = MAX_REHASH_ATTEMPTS,
            entries = self.len(),
            "Cuckoo rehash could not place every entry"
        );
        Err(CuckooError::CapacityExhausted {
            capacity,
            attempts: MAX_REHASH_ATTEMPTS,
        })
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.slots.len
    }

    /// Returns whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total slots across both arrays.
    pub fn capacity(&self) -> usize {
        self.slots.side_capacity() * 2
    }

    /// Occupied slots over total slots.
    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    /// Completed rehashes since construction.
    pub fn rehash_count(&self) -> u64 {
        self.rehash_count
    }

    /// Evictions performed by successful inserts.
    pub fn eviction_count(&self) -> u64 {
        self.eviction_count
    }

    /// All stored entries, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &ReputationEntry> {
        self.slots.iter()
    }

    /// All stored keys, in slot order.
    pub fn keys(&self) -> impl Iterator<Item = u128> + '_ {
        self.iter().map(|entry| entry.key)
    }

    /// The configuration for the table.
    pub fn config(&self) -> &CuckooConfig {
        &self.config
    }
}

impl Default for CuckooTable {
    fn default() -> Self {
        Self::new()
    }
}
