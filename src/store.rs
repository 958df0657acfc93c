//! # Backend Collaborator Traits
//!
//! Trait seams for the external systems the migration tool talks to: the
//! identity provider and the case data store. Both are treated as stateless,
//! safe-for-concurrent-call collaborators; every call returns a per-call
//! [`StoreError`] so the dispatch loop can apply its own fault policy.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::record::{CaseRecord, SearchPage};

/// Per-call backend fault.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("case not found: {case_id}")]
    NotFound { case_id: i64 },

    #[error("backend rejected the call ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Event metadata attached to every update of a run.
///
/// Fixed once per run; the defaults are the standard migration event.
#[derive(Debug, Clone)]
pub struct EventMetadata {
    pub id: String,
    pub summary: String,
    pub description: String,
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self {
            id: "migrateCase".to_string(),
            summary: "Migrate Case".to_string(),
            description: "Migrate Case".to_string(),
        }
    }
}

/// Produces the bearer token used for all downstream calls of a run.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn token(&self) -> Result<String, StoreError>;
}

/// The case data backend: paged search plus the stateful update protocol.
///
/// `update` wraps the two-phase start-event/submit-event exchange and is
/// exposed here as one atomic call that either returns the updated record or
/// fails at whichever phase broke.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a single case by id.
    async fn fetch_one(&self, token: &str, case_id: i64) -> Result<CaseRecord, StoreError>;

    /// Execute one paged search. An empty record list with no error is the
    /// canonical exhaustion signal.
    async fn search_page(&self, token: &str, body: &Value) -> Result<SearchPage, StoreError>;

    /// Submit transformed case data through the update protocol.
    async fn update(
        &self,
        token: &str,
        case_id: i64,
        event: &EventMetadata,
        data: Map<String, Value>,
    ) -> Result<CaseRecord, StoreError>;
}
