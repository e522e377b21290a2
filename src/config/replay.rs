//! Replay configuration module.
//!
//! Controls how the traffic replay splits work and how input files are read.

use super::{ConfigResult, Validate};
use crate::error::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Replay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Number of blocking workers classifying traffic concurrently
    pub worker_threads: usize,

    /// Traffic records per batch
    pub batch_size: usize,

    /// Interval between periodic rescale checks in milliseconds
    pub maintenance_interval_ms: u64,

    /// Column holding the address when an input file has a CSV header
    pub ip_column: String,

    /// Column holding the ground-truth label in a traffic CSV
    pub label_column: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
            batch_size: 10_000,
            maintenance_interval_ms: 1_000,
            ip_column: "Src IP".to_string(),
            label_column: "Label".to_string(),
        }
    }
}

impl Validate for ReplayConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.worker_threads == 0 {
            return Err(ConfigError::out_of_range(
                "replay.worker_threads",
                "must be greater than 0",
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::out_of_range(
                "replay.batch_size",
                "must be greater than 0",
            ));
        }

        if self.maintenance_interval_ms == 0 {
            return Err(ConfigError::out_of_range(
                "replay.maintenance_interval_ms",
                "must be greater than 0",
            ));
        }

        if self.ip_column.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "replay.ip_column must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
