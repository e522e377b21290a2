//! Reputation manager configuration.
//!
//! Sizing targets for the pre-filter and growth policy for the exact table.

use super::{ConfigResult, Validate};
use crate::data_structures::cuckoo::CuckooConfig;
use crate::error::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Reputation manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// False positive rate the pre-filter is kept under
    pub target_fpr: f64,

    /// Multiplier on `target_fpr` used when sizing for a bulk load
    pub bulk_fpr_headroom: f64,

    /// Exact table load factor above which it is rehashed
    pub load_factor_limit: f64,

    /// Capacity multiplier for rehashes and rebuild sizing
    pub growth_factor: usize,

    /// Displacement chain bound for exact table inserts
    pub max_kicks: usize,

    /// Initial exact table capacity in total slots
    pub initial_capacity: usize,

    /// Keys the initial pre-filter is sized for
    pub expected_items: usize,

    /// Filter rebuild events retained for inspection
    pub rebuild_history: usize,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            target_fpr: 0.01,
            bulk_fpr_headroom: 0.5,
            load_factor_limit: 0.9,
            growth_factor: 2,
            max_kicks: 500,
            initial_capacity: 2_048,
            expected_items: 1_024,
            rebuild_history: 32,
        }
    }
}

impl ReputationConfig {
    /// The false positive target used when sizing for a bulk load.
    pub fn bulk_target_fpr(&self) -> f64 {
        self.target_fpr * self.bulk_fpr_headroom
    }

    /// Exact table settings derived from this configuration.
    pub fn cuckoo_config(&self) -> CuckooConfig {
        CuckooConfig::new()
            .with_initial_capacity(self.initial_capacity)
            .with_max_kicks(self.max_kicks)
            .with_growth_factor(self.growth_factor)
    }
}

impl Validate for ReputationConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(self.target_fpr > 0.0 && self.target_fpr < 1.0) {
            return Err(ConfigError::out_of_range(
                "reputation.target_fpr",
                format!("must be in (0, 1), got {}", self.target_fpr),
            ));
        }

        if !(self.bulk_fpr_headroom > 0.0 && self.bulk_fpr_headroom <= 1.0) {
            return Err(ConfigError::out_of_range(
                "reputation.bulk_fpr_headroom",
                format!("must be in (0, 1], got {}", self.bulk_fpr_headroom),
            ));
        }

        if !(self.load_factor_limit > 0.0 && self.load_factor_limit <= 1.0) {
            return Err(ConfigError::out_of_range(
                "reputation.load_factor_limit",
                format!("must be in (0, 1], got {}", self.load_factor_limit),
            ));
        }

        if self.growth_factor < 2 {
            return Err(ConfigError::out_of_range(
                "reputation.growth_factor",
                "must be at least 2",
            ));
        }

        if self.max_kicks == 0 {
            return Err(ConfigError::out_of_range(
                "reputation.max_kicks",
                "must be greater than 0",
            ));
        }

        if self.initial_capacity < 2 {
            return Err(ConfigError::out_of_range(
                "reputation.initial_capacity",
                "must be at least 2",
            ));
        }

        if self.expected_items == 0 {
            return Err(ConfigError::out_of_range(
                "reputation.expected_items",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}
