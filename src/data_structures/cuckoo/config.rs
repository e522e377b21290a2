// Copyright (c) 2025 Kiai Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Configuration options for the cuckoo exact table.

use crate::data_structures::cuckoo::error::{CuckooError, Result};

/// Number of growth attempts a single insert or rehash may make before the
/// table reports `CapacityExhausted`.
pub const MAX_REHASH_ATTEMPTS: usize = 2;

/// Configuration for the cuckoo exact table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuckooConfig {
    /// Initial capacity in total slots across both arrays.
    /// Each array gets half, rounded up to a power of two.
    pub initial_capacity: usize,

    /// Maximum number of evictions in one displacement chain before the
    /// insert falls back to growing the table.
    pub max_kicks: usize,

    /// Capacity multiplier applied when the table grows on its own.
    pub growth_factor: usize,
}

impl CuckooConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial capacity in total slots.
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Sets the displacement chain bound.
    pub fn with_max_kicks(mut self, max_kicks: usize) -> Self {
        self.max_kicks = max_kicks;
        self
    }

    /// Sets the growth multiplier.
    pub fn with_growth_factor(mut self, growth_factor: usize) -> Self {
        self.growth_factor = growth_factor;
        self
    }

    /// Checks the configuration for values the table cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity < 2 {
            return Err(CuckooError::InvalidConfiguration(
                "initial_capacity must be at least 2".to_string(),
            ));
        }
        if self.max_kicks == 0 {
            return Err(CuckooError::InvalidConfiguration(
                "max_kicks must be greater than 0".to_string(),
            ));
        }
        if self.growth_factor < 2 {
            return Err(CuckooError::InvalidConfiguration(
                "growth_factor must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    /// Slots per array for the configured initial capacity.
    pub(crate) fn side_capacity(&self) -> usize {
        self.initial_capacity.div_ceil(2).max(1).next_power_of_two()
    }
}

impl Default for CuckooConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 2_048,
            max_kicks: 500,
            growth_factor: 2,
        }
    }
}
