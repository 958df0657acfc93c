//! # Result Aggregator
//!
//! Thread-safe accumulation of run outcomes. One instance lives per run,
//! cloned by reference into every worker task; it is the only core-owned
//! mutable state shared across tasks.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{DashMap, DashSet};
use tracing::info;

use crate::record::{RecordOutcome, RunResult};

/// Default heartbeat interval in dispatched records.
pub const DEFAULT_HEARTBEAT_EVERY: u64 = 100;

/// Concurrent accumulator for migrated/failed id sets and the seen counter.
///
/// `increment_seen` fires at dispatch time while outcomes land at completion
/// time, so `total_seen` may momentarily exceed the combined set sizes; this
/// models records still in flight. Each processed record contributes to
/// exactly one of the two sets.
#[derive(Debug)]
pub struct ResultAggregator {
    migrated: DashSet<i64>,
    failed: DashSet<i64>,
    failure_reasons: DashMap<i64, String>,
    seen: AtomicU64,
    heartbeat_every: u64,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_EVERY)
    }
}

impl ResultAggregator {
    /// `heartbeat_every = 0` disables progress logging.
    pub fn new(heartbeat_every: u64) -> Self {
        Self {
            migrated: DashSet::new(),
            failed: DashSet::new(),
            failure_reasons: DashMap::new(),
            seen: AtomicU64::new(0),
            heartbeat_every,
        }
    }

    /// Count a record as dispatched and emit a periodic heartbeat.
    pub fn increment_seen(&self) {
        let seen = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
        if self.heartbeat_every > 0 && seen % self.heartbeat_every == 0 {
            info!(
                seen = seen,
                migrated = self.migrated.len(),
                failed = self.failed.len(),
                "migration sweep heartbeat"
            );
        }
    }

    /// Apply a completed outcome; a single set insert.
    pub fn record_outcome(&self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Migrated(id) => {
                self.migrated.insert(id);
            }
            RecordOutcome::Failed(id) => {
                self.failed.insert(id);
            }
        }
    }

    /// Apply a failure outcome and keep the error message for the report.
    pub fn record_failure(&self, case_id: i64, reason: String) {
        self.failure_reasons.insert(case_id, reason);
        self.record_outcome(RecordOutcome::Failed(case_id));
    }

    pub fn total_seen(&self) -> u64 {
        self.seen.load(Ordering::Relaxed)
    }

    pub fn failure_reason(&self, case_id: i64) -> Option<String> {
        self.failure_reasons
            .get(&case_id)
            .map(|entry| entry.value().clone())
    }

    /// Immutable snapshot for the caller, taken after the pool has drained.
    pub fn snapshot(&self) -> RunResult {
        RunResult {
            migrated_ids: self.migrated.iter().map(|id| *id).collect(),
            failed_ids: self.failed.iter().map(|id| *id).collect(),
            total_seen: self.total_seen(),
        }
    }
}
