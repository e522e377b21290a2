// Copyright (c) 2025 Kiai Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Records stored in the cuckoo exact table.

use serde::Serialize;

/// Seconds since the unix epoch.
pub type Timestamp = u64;

/// One blacklisted key with its observation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReputationEntry {
    /// Normalized 128-bit key
    pub key: u128,
    /// When the key was first loaded
    pub first_seen: Timestamp,
    /// Latest load or lookup hit
    pub last_seen: Timestamp,
}

impl ReputationEntry {
    /// A fresh entry first and last seen at `now`.
    pub fn new(key: u128, now: Timestamp) -> Self {
        Self {
            key,
            first_seen: now,
            last_seen: now,
        }
    }

    /// Record an observation. `last_seen` never moves backwards.
    pub fn observe(&mut self, now: Timestamp) {
        self.last_seen = self.last_seen.max(now);
    }
}
