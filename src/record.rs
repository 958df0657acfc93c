//! # Case Record Types
//!
//! Core data types shared across the migration pipeline: the case document
//! borrowed from the backend, search page results, per-record outcomes, and
//! the final run snapshot.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

pub const LOG_STRING: &str = "-----------------------------------------";

/// A case document as returned by the record store.
///
/// The migration tool never owns cases: it borrows them from the backend,
/// transforms the `data` payload, and hands the result back through the
/// update protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl CaseRecord {
    pub fn new(id: i64, data: Map<String, Value>) -> Self {
        Self {
            id,
            jurisdiction: None,
            case_type_id: None,
            created_date: None,
            data,
        }
    }
}

/// One page of search results plus the backend-reported total.
///
/// The total reflects the whole matching set at query time and can be stale;
/// the canonical exhaustion signal is an empty `records` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    pub records: Vec<CaseRecord>,
    pub total: u64,
}

/// Outcome of the per-record update primitive.
///
/// Skipped records (eligibility predicate returned false) have no outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Migrated(i64),
    Failed(i64),
}

/// Final snapshot of a migration run.
///
/// Invariants: `migrated_ids` and `failed_ids` are disjoint, and
/// `total_seen >= migrated_ids.len() + failed_ids.len()` (strict while records
/// are in flight or were skipped by the eligibility predicate).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResult {
    pub migrated_ids: BTreeSet<i64>,
    pub failed_ids: BTreeSet<i64>,
    pub total_seen: u64,
}

impl RunResult {
    /// Number of records that reached a definite outcome.
    pub fn processed(&self) -> usize {
        self.migrated_ids.len() + self.failed_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_seen == 0 && self.processed() == 0
    }

    /// Emit the end-of-run report banner.
    pub fn log_report(&self) {
        info!("{}", LOG_STRING);
        info!("Total number of cases seen: {}", self.total_seen);
        info!("Total number of processed cases: {}", self.processed());
        info!(
            "Total number of migrations performed: {}",
            self.migrated_ids.len()
        );
        info!("{}", LOG_STRING);
        info!("Migrated cases: {}", format_ids(&self.migrated_ids));
        info!("Number of failed cases: {}", self.failed_ids.len());
        info!("Failed cases: {}", format_ids(&self.failed_ids));
        info!("{}", LOG_STRING);
    }
}

fn format_ids(ids: &BTreeSet<i64>) -> String {
    if ids.is_empty() {
        "NONE".to_string()
    } else {
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
