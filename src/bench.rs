//! Benchmark fixtures.
//!
//! Deterministic address sets and pre-loaded managers shared by the
//! criterion benches.

use std::net::Ipv4Addr;

use crate::config::ReputationConfig;
use crate::reputation::{ReputationManager, ReputationResult};

/// `count` distinct addresses starting at `first`.
pub fn synthetic_addresses(first: Ipv4Addr, count: u32) -> Vec<String> {
    let base = u32::from(first);
    (0..count)
        .map(|offset| Ipv4Addr::from(base.wrapping_add(offset)).to_string())
        .collect()
}

/// A manager with `count` blacklisted addresses from 10.0.0.0 upwards.
pub fn loaded_manager(count: u32) -> ReputationResult<ReputationManager> {
    let manager = ReputationManager::new(ReputationConfig::default())?;
    manager.load_bulk(synthetic_addresses(Ipv4Addr::new(10, 0, 0, 0), count), 0)?;
    Ok(manager)
}
