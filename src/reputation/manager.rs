//! The reputation manager.
//!
//! Owns the pre-filter and the exact table and serializes every operation on
//! them behind one lock. Classification goes filter first, exact table
//! second; loads go into both and then run the rescale policy.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::reputation::ReputationConfig;
use crate::config::Validate;
use crate::data_structures::bloom::{optimal_params, BloomFilter};
use crate::data_structures::cuckoo::{
    CuckooTable, InsertOutcome, RehashEvent, ReputationEntry, Timestamp,
};
use crate::reputation::clock::{Clock, SystemClock};
use crate::reputation::error::{ReputationError, ReputationResult};
use crate::reputation::key::{normalize, IpKey};
use crate::reputation::metrics::{MetricsSnapshot, ReputationMetrics};

/// Outcome of classifying one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The pre-filter ruled the address out
    Clean,
    /// The exact table confirmed the address
    Malicious,
    /// The pre-filter matched but the exact table did not
    FalsePositive,
}

/// Why the pre-filter was rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildReason {
    /// The live estimate went over the target
    FprExceeded,
    /// A bulk load would have pushed the estimate over the target
    BulkPreload,
}

/// Record of one pre-filter rebuild.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebuildEvent {
    /// Rebuild number since construction, starting at 1
    pub sequence: u64,
    /// What triggered the rebuild
    pub reason: RebuildReason,
    /// When the rebuild ran
    pub timestamp: Timestamp,
    /// Exact table entries reinserted into the new filter
    pub active_entries: usize,
    /// Key count the new filter was sized for
    pub sized_for: usize,
    /// Bit count before
    pub prev_m_bits: usize,
    /// Hash count before
    pub prev_k: usize,
    /// Bit count after
    pub m_bits: usize,
    /// Hash count after
    pub k: usize,
    /// Estimate right after the rebuild
    pub estimated_fpr: f64,
    /// Target the new filter was sized against
    pub target_fpr: f64,
}

/// What one rescale check did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RescaleOutcome {
    /// Set when the exact table was rehashed for load factor
    pub rehash: Option<RehashEvent>,
    /// Set when the pre-filter was rebuilt
    pub rebuild: Option<RebuildEvent>,
}

impl RescaleOutcome {
    /// Neither structure changed.
    pub fn is_noop(&self) -> bool {
        self.rehash.is_none() && self.rebuild.is_none()
    }
}

/// Result of [`ReputationManager::load_bulk`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkLoadReport {
    /// Keys that were new to the exact table
    pub inserted: usize,
    /// Keys that were already present
    pub refreshed: usize,
    /// Set when the filter was resized before the batch went in
    pub preload_rebuild: Option<RebuildEvent>,
    /// Rescale check run after the batch
    pub rescale: RescaleOutcome,
}

/// Everything the lock protects.
struct ReputationState {
    filter: BloomFilter,
    table: CuckooTable,
    rebuild_events: VecDeque<RebuildEvent>,
    rebuild_sequence: u64,
}

/// Two-stage blacklist classifier.
///
/// Every public call takes the internal lock once and runs to completion, so
/// a lookup never sees a half-rehashed table and a check never reads a
/// half-built filter. Rehash and rebuild block callers for their duration.
///
/// # Examples
///
/// ```
/// use kiai_lib::config::ReputationConfig;
/// use kiai_lib::reputation::{Classification, ReputationManager};
///
/// let manager = ReputationManager::new(ReputationConfig::default()).unwrap();
/// manager.load("10.0.0.1", 1_700_000_000).unwrap();
///
/// assert_eq!(manager.fast_check("10.0.0.1").unwrap(), Classification::Malicious);
/// assert!(manager.fast_check("not-an-ip").is_err());
/// ```
pub struct ReputationManager {
    state: Mutex<ReputationState>,
    metrics: ReputationMetrics,
    clock: Arc<dyn Clock>,
    config: ReputationConfig,
}

impl ReputationManager {
    /// Creates a manager using the wall clock.
    pub fn new(config: ReputationConfig) -> ReputationResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a manager with an explicit time source for lookup hits.
    ///
    /// # Errors
    ///
    /// [`ReputationError::InvalidConfiguration`] if the configuration does
    /// not validate.
    pub fn with_clock(config: ReputationConfig, clock: Arc<dyn Clock>) -> ReputationResult<Self> {
        config
            .validate()
            .map_err(|e| ReputationError::InvalidConfiguration(e.to_string()))?;

        let table = CuckooTable::with_config(config.cuckoo_config())?;
        let filter = BloomFilter::with_capacity(config.expected_items, config.target_fpr)?;

        debug!(
            m_bits = filter.m_bits(),
            k = filter.hash_count(),
            capacity = table.capacity(),
            "Reputation manager created"
        );

        Ok(Self {
            state: Mutex::new(ReputationState {
                filter,
                table,
                rebuild_events: VecDeque::new(),
                rebuild_sequence: 0,
            }),
            metrics: ReputationMetrics::new(),
            clock,
            config,
        })
    }

    /// Load one blacklisted address seen at `now`.
    ///
    /// A new key goes into the exact table and the pre-filter. A known key
    /// only has its `last_seen` advanced. The rescale policy runs afterwards.
    ///
    /// # Errors
    ///
    /// - [`ReputationError::InvalidFormat`] before either structure is touched.
    /// - [`ReputationError::CapacityExhausted`] if the exact table could not
    ///   place the key; both structures are unchanged.
    ///
    /// A failure of the rescale check that follows a successful insert is
    /// logged, not returned: the key is stored and the outcome reflects that.
    /// The next [`maybe_rescale`](Self::maybe_rescale) retries the check.
    pub fn load(&self, address: &str, now: Timestamp) -> ReputationResult<InsertOutcome> {
        let key = self.normalize(address)?;
        self.load_key(key, now)
    }

    /// Load an already normalized key.
    pub fn load_key(&self, key: IpKey, now: Timestamp) -> ReputationResult<InsertOutcome> {
        let mut state = self.state.lock();
        let outcome = self.insert_locked(&mut state, key, now)?;
        if let Err(error) = self.rescale_locked(&mut state) {
            warn!(%error, %key, "Rescale after load failed, key is stored");
        }
        Ok(outcome)
    }

    /// Load a whole blacklist at once.
    ///
    /// Every address is normalized before anything is inserted; one malformed
    /// address rejects the batch. If absorbing the batch would take the
    /// pre-filter over its target, the filter is first rebuilt for the
    /// combined size at the bulk headroom target. One rescale check runs at
    /// the end.
    ///
    /// # Errors
    ///
    /// [`ReputationError::InvalidFormat`] for the first malformed address, or
    /// [`ReputationError::CapacityExhausted`] if a key could not be placed.
    /// On the latter, keys before the failing one remain loaded in both
    /// structures. A failed rescale after the batch is logged only.
    pub fn load_bulk<I, S>(&self, addresses: I, now: Timestamp) -> ReputationResult<BulkLoadReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = addresses
            .into_iter()
            .map(|address| self.normalize(address.as_ref()))
            .collect::<ReputationResult<Vec<IpKey>>>()?;
        self.load_bulk_keys(keys, now)
    }

    /// Load a batch of already normalized keys, as [`load_bulk`](Self::load_bulk).
    pub fn load_bulk_keys(
        &self,
        keys: Vec<IpKey>,
        now: Timestamp,
    ) -> ReputationResult<BulkLoadReport> {
        let mut state = self.state.lock();
        let mut report = BulkLoadReport::default();

        if state.filter.projected_fpr(keys.len()) > self.config.target_fpr {
            let sized_for = state.table.len().saturating_add(keys.len());
            report.preload_rebuild = Some(self.rebuild_locked(
                &mut state,
                RebuildReason::BulkPreload,
                sized_for,
                self.config.bulk_target_fpr(),
            )?);
        }

        for key in keys {
            match self.insert_locked(&mut state, key, now)? {
                InsertOutcome::Inserted => report.inserted += 1,
                InsertOutcome::Refreshed => report.refreshed += 1,
            }
        }

        match self.rescale_locked(&mut state) {
            Ok(rescale) => report.rescale = rescale,
            Err(error) => warn!(%error, "Rescale after bulk load failed, batch is stored"),
        }

        info!(
            inserted = report.inserted,
            refreshed = report.refreshed,
            entries = state.table.len(),
            estimated_fpr = state.filter.estimated_fpr(),
            "Bulk load complete"
        );
        Ok(report)
    }

    /// Classify one address.
    ///
    /// A pre-filter negative is `Clean`. A positive goes to the exact table:
    /// a hit is `Malicious` and advances the entry's `last_seen`, a miss is
    /// `FalsePositive`. Never returns `Malicious` for a key that was not
    /// loaded.
    ///
    /// # Errors
    ///
    /// [`ReputationError::InvalidFormat`]; malformed input is never `Clean`.
    pub fn fast_check(&self, address: &str) -> ReputationResult<Classification> {
        let started = Instant::now();
        let key = self.normalize(address)?;
        let classification = self.classify(key);
        self.metrics.record_check_latency(started.elapsed());
        Ok(classification)
    }

    /// Classify an already normalized key.
    pub fn check_key(&self, key: IpKey) -> Classification {
        let started = Instant::now();
        let classification = self.classify(key);
        self.metrics.record_check_latency(started.elapsed());
        classification
    }

    fn classify(&self, key: IpKey) -> Classification {
        let raw = key.as_u128();
        let mut state = self.state.lock();

        let positive = state.filter.might_contain(raw);
        self.metrics.record_filter_check(positive);
        if !positive {
            trace!(%key, "Clean");
            return Classification::Clean;
        }

        let hit = state.table.lookup(raw, self.clock.now()).is_some();
        self.metrics.record_exact_lookup(hit);
        if hit {
            trace!(%key, "Malicious");
            Classification::Malicious
        } else {
            trace!(%key, "Pre-filter false positive");
            Classification::FalsePositive
        }
    }

    /// Run the rescale policy once.
    ///
    /// Rehashes the exact table when its load factor is over the limit, then
    /// rebuilds the pre-filter when its estimate is over the target. Both
    /// steps run under one lock. A failed rehash does not skip the rebuild
    /// check; its error is returned after the check has run.
    pub fn maybe_rescale(&self) -> ReputationResult<RescaleOutcome> {
        let mut state = self.state.lock();
        self.rescale_locked(&mut state)
    }

    /// Exact table entry for `address`, without recording an observation.
    pub fn entry(&self, address: &str) -> ReputationResult<Option<ReputationEntry>> {
        let key = self.normalize(address)?;
        Ok(self.state.lock().table.get(key.as_u128()).copied())
    }

    /// Point-in-time counters plus current structure state.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock();
        let mut snapshot = self.metrics.snapshot();
        snapshot.estimated_fpr = state.filter.estimated_fpr();
        snapshot.load_factor = state.table.load_factor();
        snapshot.entries = state.table.len();
        snapshot.capacity = state.table.capacity();
        snapshot.evictions = state.table.eviction_count();
        snapshot.m_bits = state.filter.m_bits();
        snapshot.k = state.filter.hash_count();
        snapshot
    }

    /// Retained rebuild events, oldest first.
    pub fn rebuild_events(&self) -> Vec<RebuildEvent> {
        self.state.lock().rebuild_events.iter().cloned().collect()
    }

    /// Entries in the exact table.
    pub fn len(&self) -> usize {
        self.state.lock().table.len()
    }

    /// Whether nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total exact table slots.
    pub fn capacity(&self) -> usize {
        self.state.lock().table.capacity()
    }

    /// Exact table load factor.
    pub fn load_factor(&self) -> f64 {
        self.state.lock().table.load_factor()
    }

    /// Current pre-filter false positive estimate.
    pub fn estimated_fpr(&self) -> f64 {
        self.state.lock().filter.estimated_fpr()
    }

    /// Rehashes the exact table has performed, for any reason.
    pub fn rehash_count(&self) -> u64 {
        self.state.lock().table.rehash_count()
    }

    /// The configuration the manager was built with.
    pub fn config(&self) -> &ReputationConfig {
        &self.config
    }

    /// Normalize `address`, counting it as invalid input when malformed.
    pub fn normalize(&self, address: &str) -> ReputationResult<IpKey> {
        normalize(address).inspect_err(|_| {
            self.metrics.record_invalid_input();
            debug!(address, "Rejected malformed address");
        })
    }

    fn insert_locked(
        &self,
        state: &mut ReputationState,
        key: IpKey,
        now: Timestamp,
    ) -> ReputationResult<InsertOutcome> {
        let raw = key.as_u128();
        let outcome = state.table.insert(raw, now)?;
        if outcome == InsertOutcome::Inserted {
            // A refreshed key already has its bits set.
            state.filter.insert(raw);
        }
        self.metrics.record_load(outcome);
        Ok(outcome)
    }

    fn rescale_locked(&self, state: &mut ReputationState) -> ReputationResult<RescaleOutcome> {
        let mut outcome = RescaleOutcome::default();
        let mut rehash_error = None;

        let load_factor = state.table.load_factor();
        if load_factor > self.config.load_factor_limit {
            match state.table.rehash(self.config.growth_factor) {
                Ok(event) => outcome.rehash = Some(event),
                Err(error) => rehash_error = Some(error),
            }
        }
        if let Some(event) = &outcome.rehash {
            self.metrics.record_rehash();
            info!(
                load_factor,
                limit = self.config.load_factor_limit,
                old_capacity = event.old_capacity,
                new_capacity = event.new_capacity,
                entries = event.entries,
                "Exact table rehashed for load factor"
            );
        }

        if state.filter.estimated_fpr() > self.config.target_fpr {
            let sized_for = state
                .table
                .len()
                .max(1)
                .saturating_mul(self.config.growth_factor);
            outcome.rebuild = Some(self.rebuild_locked(
                state,
                RebuildReason::FprExceeded,
                sized_for,
                self.config.target_fpr,
            )?);
        }

        match rehash_error {
            Some(error) => Err(error.into()),
            None => Ok(outcome),
        }
    }

    /// Build a fresh filter from the exact table's keys and swap it in.
    fn rebuild_locked(
        &self,
        state: &mut ReputationState,
        reason: RebuildReason,
        sized_for: usize,
        target_fpr: f64,
    ) -> ReputationResult<RebuildEvent> {
        let params = optimal_params(sized_for, target_fpr)?;
        let mut filter = BloomFilter::new(params);
        for key in state.table.keys() {
            filter.insert(key);
        }

        state.rebuild_sequence += 1;
        let event = RebuildEvent {
            sequence: state.rebuild_sequence,
            reason,
            timestamp: self.clock.now(),
            active_entries: state.table.len(),
            sized_for,
            prev_m_bits: state.filter.m_bits(),
            prev_k: state.filter.hash_count(),
            m_bits: filter.m_bits(),
            k: filter.hash_count(),
            estimated_fpr: filter.estimated_fpr(),
            target_fpr,
        };
        state.filter = filter;

        self.metrics.record_rebuild();
        info!(
            sequence = event.sequence,
            reason = ?event.reason,
            active_entries = event.active_entries,
            prev_m_bits = event.prev_m_bits,
            prev_k = event.prev_k,
            m_bits = event.m_bits,
            k = event.k,
            estimated_fpr = event.estimated_fpr,
            target_fpr,
            "Pre-filter rebuilt"
        );

        if self.config.rebuild_history > 0 {
            if state.rebuild_events.len() == self.config.rebuild_history {
                state.rebuild_events.pop_front();
            }
            state.rebuild_events.push_back(event.clone());
        }
        Ok(event)
    }
}

impl fmt::Debug for ReputationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReputationManager")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reputation::clock::MockClock;

    fn fixed_clock(now: Timestamp) -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(now);
        Arc::new(clock)
    }

    fn manager() -> ReputationManager {
        ReputationManager::with_clock(ReputationConfig::default(), fixed_clock(5_000)).unwrap()
    }

    #[test]
    fn test_load_then_check() {
        let manager = manager();
        assert_eq!(manager.load("10.0.0.1", 100).unwrap(), InsertOutcome::Inserted);

        assert_eq!(
            manager.fast_check("10.0.0.1").unwrap(),
            Classification::Malicious
        );
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_hit_uses_clock_for_last_seen() {
        let manager = manager();
        manager.load("10.0.0.1", 100).unwrap();

        // entry() is a pure query
        assert_eq!(manager.entry("10.0.0.1").unwrap().unwrap().last_seen, 100);

        manager.fast_check("10.0.0.1").unwrap();
        let entry = manager.entry("10.0.0.1").unwrap().unwrap();
        assert_eq!(entry.first_seen, 100);
        assert_eq!(entry.last_seen, 5_000);
    }

    #[test]
    fn test_reload_is_idempotent() {
        let manager = manager();
        manager.load("192.168.0.7", 10).unwrap();
        assert_eq!(
            manager.load("192.168.0.7", 20).unwrap(),
            InsertOutcome::Refreshed
        );

        let entry = manager.entry("192.168.0.7").unwrap().unwrap();
        assert_eq!(manager.len(), 1);
        assert_eq!(entry.first_seen, 10);
        assert_eq!(entry.last_seen, 20);

        let snapshot = manager.metrics_snapshot();
        assert_eq!(snapshot.loads, 2);
        assert_eq!(snapshot.refreshed_loads, 1);
    }

    #[test]
    fn test_invalid_input_is_surfaced() {
        let manager = manager();
        assert!(matches!(
            manager.load("10.0.0", 1),
            Err(ReputationError::InvalidFormat(_))
        ));
        assert!(matches!(
            manager.fast_check("garbage"),
            Err(ReputationError::InvalidFormat(_))
        ));
        assert!(manager.is_empty());
        assert_eq!(manager.metrics_snapshot().invalid_inputs, 2);
    }

    #[test]
    fn test_clean_path_skips_exact_table() {
        let mut clock = MockClock::new();
        clock.expect_now().never();
        let manager =
            ReputationManager::with_clock(ReputationConfig::default(), Arc::new(clock)).unwrap();

        assert_eq!(manager.fast_check("8.8.8.8").unwrap(), Classification::Clean);
        let MetricsSnapshot {
            probabilistic_negative_count,
            probabilistic_positive_count,
            checks,
            ..
        } = manager.metrics_snapshot();
        assert_eq!(probabilistic_negative_count, 1);
        assert_eq!(probabilistic_positive_count, 0);
        assert_eq!(checks, 1);
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        let config = ReputationConfig {
            target_fpr: 1.5,
            ..ReputationConfig::default()
        };
        assert!(matches!(
            ReputationManager::new(config),
            Err(ReputationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_fpr_rebuild_restores_target() {
        let config = ReputationConfig {
            expected_items: 16,
            ..ReputationConfig::default()
        };
        let manager = ReputationManager::with_clock(config, fixed_clock(1)).unwrap();

        for i in 0..2_000u32 {
            let address = std::net::Ipv4Addr::from(0x0a00_0000 + i).to_string();
            manager.load(&address, 1).unwrap();
        }

        assert!(manager.estimated_fpr() <= 0.01);
        let events = manager.rebuild_events();
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.reason == RebuildReason::FprExceeded));
        assert!(events.windows(2).all(|w| w[1].sequence == w[0].sequence + 1));
        assert!(events.iter().all(|e| e.estimated_fpr <= e.target_fpr));
    }

    #[test]
    fn test_rebuild_history_is_bounded() {
        let config = ReputationConfig {
            expected_items: 1,
            rebuild_history: 2,
            ..ReputationConfig::default()
        };
        let manager = ReputationManager::with_clock(config, fixed_clock(1)).unwrap();
        for i in 0..5_000u32 {
            manager
                .load_key(IpKey::from(std::net::Ipv4Addr::from(i)), 1)
                .unwrap();
        }

        let events = manager.rebuild_events();
        assert_eq!(events.len(), 2);
        assert!(manager.metrics_snapshot().rebuilds > 2);
        assert_eq!(events[1].sequence, manager.metrics_snapshot().rebuilds);
    }

    #[test]
    fn test_load_reports_stored_key_when_rescale_fails() {
        let config = ReputationConfig {
            initial_capacity: 8,
            load_factor_limit: 0.1,
            ..ReputationConfig::default()
        };
        let mut manager = ReputationManager::with_clock(config, fixed_clock(1)).unwrap();
        // Any rehash now overflows the capacity computation.
        manager.config.growth_factor = usize::MAX / 2;

        assert_eq!(manager.load("10.9.8.7", 1).unwrap(), InsertOutcome::Inserted);
        assert_eq!(manager.fast_check("10.9.8.7").unwrap(), Classification::Malicious);
        assert_eq!(manager.capacity(), 8);
        assert_eq!(manager.metrics_snapshot().rehashes, 0);

        assert!(matches!(
            manager.maybe_rescale(),
            Err(ReputationError::CapacityExhausted(_))
        ));
    }

    #[test]
    fn test_snapshot_counters_match_gauges_under_load() {
        let manager = manager();
        std::thread::scope(|scope| {
            for t in 0..4u32 {
                let manager = &manager;
                scope.spawn(move || {
                    for i in 0..2_000u32 {
                        let key = IpKey::from(std::net::Ipv4Addr::from((t << 16) | (i % 1_500)));
                        manager.load_key(key, 1).unwrap();
                    }
                });
            }
            for _ in 0..200 {
                let snapshot = manager.metrics_snapshot();
                assert_eq!(
                    snapshot.loads - snapshot.refreshed_loads,
                    snapshot.entries as u64
                );
            }
        });

        let snapshot = manager.metrics_snapshot();
        assert_eq!(snapshot.loads, 8_000);
        assert_eq!(snapshot.entries, 6_000);
    }

    #[test]
    fn test_rescale_noop_when_within_limits() {
        let manager = manager();
        manager.load("1.2.3.4", 1).unwrap();
        assert!(manager.maybe_rescale().unwrap().is_noop());
    }
}
