//! Counters and latency observations for reputation classification.
//!
//! Counters are atomics so the hot path only pays for relaxed increments and
//! a reporter can read them without taking the manager's lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::data_structures::cuckoo::InsertOutcome;

/// Live counters owned by a [`ReputationManager`](super::ReputationManager).
#[derive(Debug, Default)]
pub struct ReputationMetrics {
    filter_positives: AtomicU64,
    filter_negatives: AtomicU64,
    exact_hits: AtomicU64,
    false_positives: AtomicU64,
    loads: AtomicU64,
    refreshed_loads: AtomicU64,
    invalid_inputs: AtomicU64,
    rehashes: AtomicU64,
    rebuilds: AtomicU64,
    check_latency_total_ns: AtomicU64,
    check_latency_count: AtomicU64,
    check_latency_max_ns: AtomicU64,
}

impl ReputationMetrics {
    /// Creates a zeroed set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pre-filter answer.
    pub fn record_filter_check(&self, positive: bool) {
        if positive {
            self.filter_positives.fetch_add(1, Ordering::Relaxed);
        } else {
            self.filter_negatives.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record the exact-table answer after a positive pre-filter check.
    pub fn record_exact_lookup(&self, hit: bool) {
        if hit {
            self.exact_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.false_positives.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a successful load.
    pub fn record_load(&self, outcome: InsertOutcome) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        if outcome == InsertOutcome::Refreshed {
            self.refreshed_loads.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an address rejected by normalization.
    pub fn record_invalid_input(&self) {
        self.invalid_inputs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a load-factor triggered rehash.
    pub fn record_rehash(&self) {
        self.rehashes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a filter rebuild.
    pub fn record_rebuild(&self) {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the latency of one classification.
    pub fn record_check_latency(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.check_latency_total_ns
            .fetch_add(nanos, Ordering::Relaxed);
        self.check_latency_count.fetch_add(1, Ordering::Relaxed);
        self.check_latency_max_ns.fetch_max(nanos, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters. Structure gauges are left at
    /// zero for the owner to fill in.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.check_latency_total_ns.load(Ordering::Relaxed);
        let count = self.check_latency_count.load(Ordering::Relaxed);
        let average_check_latency_ns = if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        };

        MetricsSnapshot {
            probabilistic_positive_count: self.filter_positives.load(Ordering::Relaxed),
            probabilistic_negative_count: self.filter_negatives.load(Ordering::Relaxed),
            exact_hit_count: self.exact_hits.load(Ordering::Relaxed),
            false_positive_count: self.false_positives.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            refreshed_loads: self.refreshed_loads.load(Ordering::Relaxed),
            invalid_inputs: self.invalid_inputs.load(Ordering::Relaxed),
            rehashes: self.rehashes.load(Ordering::Relaxed),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
            checks: count,
            average_check_latency_ns,
            max_check_latency_ns: self.check_latency_max_ns.load(Ordering::Relaxed),
            ..MetricsSnapshot::default()
        }
    }
}

/// Read-only view of classification counters and structure state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Pre-filter said "possibly present"
    pub probabilistic_positive_count: u64,
    /// Pre-filter said "definitely absent"
    pub probabilistic_negative_count: u64,
    /// Exact table confirmed the key
    pub exact_hit_count: u64,
    /// Pre-filter positive the exact table did not confirm
    pub false_positive_count: u64,
    /// Successful loads, including refreshes
    pub loads: u64,
    /// Loads of an already present key
    pub refreshed_loads: u64,
    /// Addresses rejected by normalization
    pub invalid_inputs: u64,
    /// Load-factor triggered rehashes
    pub rehashes: u64,
    /// Filter rebuilds
    pub rebuilds: u64,
    /// Timed classifications
    pub checks: u64,
    /// Mean classification latency
    pub average_check_latency_ns: f64,
    /// Slowest classification
    pub max_check_latency_ns: u64,
    /// Current filter false positive estimate
    pub estimated_fpr: f64,
    /// Current exact table load factor
    pub load_factor: f64,
    /// Entries in the exact table
    pub entries: usize,
    /// Total exact table slots
    pub capacity: usize,
    /// Evictions performed by the exact table
    pub evictions: u64,
    /// Filter bit count
    pub m_bits: usize,
    /// Filter hash count
    pub k: usize,
}

impl MetricsSnapshot {
    /// Observed share of pre-filter positives that the exact table rejected.
    pub fn observed_false_positive_ratio(&self) -> f64 {
        let checks = self.probabilistic_positive_count + self.probabilistic_negative_count;
        if checks == 0 {
            0.0
        } else {
            self.false_positive_count as f64 / checks as f64
        }
    }
}
