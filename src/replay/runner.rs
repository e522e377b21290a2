//! Traffic replay against a loaded reputation manager.
//!
//! Blacklists are loaded first: the base list in one bulk load, the
//! incremental list one address at a time. Traffic is then classified in
//! batches, each batch split across blocking workers, while the maintenance
//! driver runs rescale checks in the background.

use std::ops::{AddAssign, Range};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ReplayConfig;
use crate::data_structures::InsertOutcome;
use crate::error::{KiaiError, KiaiResult};
use crate::reputation::{
    spawn_maintenance, Classification, Clock, MetricsSnapshot, ReputationManager, SystemClock,
};

use super::source::{read_addresses, read_traffic, TrafficRecord};

/// Files for one replay run.
#[derive(Debug, Clone)]
pub struct ReplayInputs {
    /// Base blacklist, bulk loaded
    pub base: PathBuf,
    /// Incremental blacklist, loaded address by address
    pub incremental: Option<PathBuf>,
    /// Traffic log to classify
    pub traffic: PathBuf,
}

/// Outcome of loading the blacklists.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadSummary {
    /// Base addresses inserted
    pub base_inserted: usize,
    /// Malformed base addresses, skipped
    pub base_invalid: usize,
    /// Incremental addresses inserted
    pub incremental_inserted: usize,
    /// Incremental addresses already present
    pub incremental_refreshed: usize,
    /// Malformed incremental addresses, skipped
    pub incremental_invalid: usize,
}

/// Classification totals for a span of traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrafficTotals {
    /// Well-formed records classified
    pub requests: u64,
    /// Records rejected as malformed
    pub invalid: u64,
    /// Classified clean by the pre-filter
    pub clean: u64,
    /// Confirmed by the exact table
    pub malicious: u64,
    /// Pre-filter positives the exact table rejected
    pub false_positive: u64,
    /// Records labelled as attacks
    pub labelled_attack: u64,
    /// Records labelled as benign
    pub labelled_clean: u64,
    /// Attack-labelled records classified malicious
    pub detected_attack: u64,
    /// Benign-labelled records that were pre-filter false positives
    pub labelled_clean_false_positive: u64,
}

impl TrafficTotals {
    fn record(&mut self, classification: Classification, labelled_attack: Option<bool>) {
        self.requests += 1;
        match classification {
            Classification::Clean => self.clean += 1,
            Classification::Malicious => self.malicious += 1,
            Classification::FalsePositive => self.false_positive += 1,
        }
        match labelled_attack {
            Some(true) => {
                self.labelled_attack += 1;
                if classification == Classification::Malicious {
                    self.detected_attack += 1;
                }
            }
            Some(false) => {
                self.labelled_clean += 1;
                if classification == Classification::FalsePositive {
                    self.labelled_clean_false_positive += 1;
                }
            }
            None => {}
        }
    }

    /// False positives over traffic that was not blacklisted.
    ///
    /// Uses labels when the log has them, otherwise every record that was not
    /// confirmed malicious.
    pub fn observed_fpr(&self) -> Option<f64> {
        if self.labelled_clean > 0 {
            return Some(self.labelled_clean_false_positive as f64 / self.labelled_clean as f64);
        }
        let negatives = self.clean + self.false_positive;
        (negatives > 0).then(|| self.false_positive as f64 / negatives as f64)
    }

    /// Share of attack-labelled records confirmed malicious.
    pub fn recall(&self) -> Option<f64> {
        (self.labelled_attack > 0)
            .then(|| self.detected_attack as f64 / self.labelled_attack as f64)
    }
}

impl AddAssign for TrafficTotals {
    fn add_assign(&mut self, other: Self) {
        self.requests += other.requests;
        self.invalid += other.invalid;
        self.clean += other.clean;
        self.malicious += other.malicious;
        self.false_positive += other.false_positive;
        self.labelled_attack += other.labelled_attack;
        self.labelled_clean += other.labelled_clean;
        self.detected_attack += other.detected_attack;
        self.labelled_clean_false_positive += other.labelled_clean_false_positive;
    }
}

/// Everything a replay run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// Blacklist loading outcome
    pub load: LoadSummary,
    /// Traffic classification totals
    pub traffic: TrafficTotals,
    /// Observed false positive rate
    pub observed_fpr: Option<f64>,
    /// Attack recall, when the log is labelled
    pub recall: Option<f64>,
    /// Wall time spent classifying traffic
    pub duration_secs: f64,
    /// Classified records per second
    pub throughput: f64,
    /// Rescale checks run by the maintenance driver
    pub maintenance_ticks: u64,
    /// Manager state at the end of the run
    pub metrics: MetricsSnapshot,
}

/// Drives blacklist loading and traffic classification.
#[derive(Debug, Clone)]
pub struct ReplayRunner {
    manager: Arc<ReputationManager>,
    config: ReplayConfig,
}

impl ReplayRunner {
    /// Creates a runner around a shared manager.
    pub fn new(manager: Arc<ReputationManager>, config: ReplayConfig) -> Self {
        Self { manager, config }
    }

    /// The manager being driven.
    pub fn manager(&self) -> &Arc<ReputationManager> {
        &self.manager
    }

    /// Read every input file, load the blacklists and replay the traffic.
    pub async fn run(&self, inputs: &ReplayInputs) -> anyhow::Result<ReplayReport> {
        let base = read_addresses(&inputs.base, &self.config.ip_column)?;
        let incremental = match &inputs.incremental {
            Some(path) => read_addresses(path, &self.config.ip_column)?,
            None => Vec::new(),
        };
        let traffic = read_traffic(
            &inputs.traffic,
            &self.config.ip_column,
            &self.config.label_column,
        )?;

        info!(
            base = base.len(),
            incremental = incremental.len(),
            traffic = traffic.len(),
            "Inputs read"
        );

        let load = self
            .load_blacklists(&base, &incremental, SystemClock.now())
            .context("failed to load blacklists")?;
        let (totals, duration, maintenance_ticks) =
            self.replay(traffic).await.context("traffic replay failed")?;

        Ok(self.report(load, totals, duration, maintenance_ticks))
    }

    /// Load the base list in bulk and the incremental list one by one.
    ///
    /// Malformed addresses are counted and logged, then skipped.
    pub fn load_blacklists(
        &self,
        base: &[String],
        incremental: &[String],
        now: u64,
    ) -> KiaiResult<LoadSummary> {
        let mut summary = LoadSummary::default();

        let mut keys = Vec::with_capacity(base.len());
        for address in base {
            match self.manager.normalize(address) {
                Ok(key) => keys.push(key),
                Err(_) => {
                    warn!(address = address.as_str(), "Skipping malformed base address");
                    summary.base_invalid += 1;
                }
            }
        }

        let report = self.manager.load_bulk_keys(keys, now)?;
        summary.base_inserted = report.inserted;

        for address in incremental {
            match self.manager.load(address, now) {
                Ok(InsertOutcome::Inserted) => summary.incremental_inserted += 1,
                Ok(InsertOutcome::Refreshed) => summary.incremental_refreshed += 1,
                Err(e) if e.is_input_error() => {
                    warn!(address = address.as_str(), "Skipping malformed incremental address");
                    summary.incremental_invalid += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            base_inserted = summary.base_inserted,
            incremental_inserted = summary.incremental_inserted,
            entries = self.manager.len(),
            estimated_fpr = self.manager.estimated_fpr(),
            load_factor = self.manager.load_factor(),
            "Blacklists loaded"
        );
        Ok(summary)
    }

    /// Classify traffic in batches with the maintenance driver running.
    ///
    /// Returns the totals, the time spent and the number of maintenance
    /// checks that ran.
    pub async fn replay(
        &self,
        traffic: Vec<TrafficRecord>,
    ) -> KiaiResult<(TrafficTotals, Duration, u64)> {
        let started = Instant::now();
        let maintenance = spawn_maintenance(
            Arc::clone(&self.manager),
            Duration::from_millis(self.config.maintenance_interval_ms),
        );

        let result = self.classify_all(Arc::new(traffic)).await;
        let ticks = maintenance.shutdown().await;
        let totals = result?;

        Ok((totals, started.elapsed(), ticks))
    }

    async fn classify_all(&self, traffic: Arc<Vec<TrafficRecord>>) -> KiaiResult<TrafficTotals> {
        let mut totals = TrafficTotals::default();
        let batch_size = self.config.batch_size.max(1);

        let mut start = 0;
        while start < traffic.len() {
            let end = traffic.len().min(start + batch_size);
            let tasks = split_range(start..end, self.config.worker_threads).map(|range| {
                let manager = Arc::clone(&self.manager);
                let traffic = Arc::clone(&traffic);
                tokio::task::spawn_blocking(move || classify_records(&manager, &traffic[range]))
            });

            for joined in join_all(tasks).await {
                totals += joined
                    .map_err(|e| KiaiError::Custom(format!("Replay worker failed: {e}")))?;
            }

            info!(
                processed = end,
                total = traffic.len(),
                malicious = totals.malicious,
                false_positive = totals.false_positive,
                "Replay batch complete"
            );
            start = end;
        }

        Ok(totals)
    }

    fn report(
        &self,
        load: LoadSummary,
        traffic: TrafficTotals,
        duration: Duration,
        maintenance_ticks: u64,
    ) -> ReplayReport {
        let duration_secs = duration.as_secs_f64();
        let throughput = if duration_secs > 0.0 {
            traffic.requests as f64 / duration_secs
        } else {
            0.0
        };

        ReplayReport {
            load,
            traffic,
            observed_fpr: traffic.observed_fpr(),
            recall: traffic.recall(),
            duration_secs,
            throughput,
            maintenance_ticks,
            metrics: self.manager.metrics_snapshot(),
        }
    }
}

fn classify_records(manager: &ReputationManager, records: &[TrafficRecord]) -> TrafficTotals {
    let mut totals = TrafficTotals::default();
    for record in records {
        match manager.fast_check(&record.address) {
            Ok(classification) => totals.record(classification, record.labelled_attack),
            Err(_) => totals.invalid += 1,
        }
    }
    totals
}

/// Split `range` into at most `parts` contiguous, non-empty pieces.
fn split_range(range: Range<usize>, parts: usize) -> impl Iterator<Item = Range<usize>> {
    let len = range.len();
    let chunk = len.div_ceil(parts.max(1)).max(1);
    (range.start..range.end)
        .step_by(chunk)
        .map(move |start| start..(start + chunk).min(range.end))
}
