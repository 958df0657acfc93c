//! # Case Migration Core
//!
//! Batch data-migration tool for a case-management backend: it pages through
//! cases behind a search API, tests each case against a migration-eligibility
//! predicate, applies a data transformation, and submits the transformed data
//! back through the backend's two-phase update protocol.
//!
//! ## Architecture
//!
//! The heart of the crate is the **cursor-paginated fetch-dispatch-aggregate
//! loop**: a single control task walks the unbounded result set page by page
//! through a [`page_source::PageSource`], fans each page out to a bounded
//! worker pool, and accumulates per-record outcomes in a thread-safe
//! [`aggregator::ResultAggregator`]. Page fetching is strictly sequential (one
//! cursor, one owner); record processing is parallel.
//!
//! ## Module Organization
//!
//! - [`processor`] - The dispatch loop, single-case path, and shared
//!   per-record update primitive
//! - [`page_source`] - Search-after, page-number, and date-bucket walks over
//!   the result set
//! - [`aggregator`] - Concurrent outcome accumulation and progress heartbeats
//! - [`cursor`] - Resume position and per-run processing limit
//! - [`strategy`] - Pluggable eligibility-plus-transform campaigns
//! - [`store`] - Backend collaborator traits and per-call errors
//! - [`http_store`] - REST clients for the case data and identity backends
//! - [`query`] - Search body builders
//! - [`record`] - Case record, page, and run-result types
//! - [`config`] - Run parameters and validation
//! - [`error`] - Run-level error taxonomy
//!
//! ## Guarantees
//!
//! - A record submitted for update ends up in exactly one of the migrated or
//!   failed id sets; the two sets are always disjoint.
//! - One record's failure never aborts the run; one page's fetch fault ends
//!   fetching but still drains in-flight work and reports partial results.
//! - The sweep stops on whichever comes first: result-set exhaustion (an
//!   empty page) or the per-run processing limit.

pub mod aggregator;
pub mod config;
pub mod cursor;
pub mod error;
pub mod http_store;
pub mod logging;
pub mod page_source;
pub mod processor;
pub mod query;
pub mod record;
pub mod store;
pub mod strategy;

pub use aggregator::ResultAggregator;
pub use config::MigrationConfig;
pub use cursor::{PaginationCursor, ProcessingLimit};
pub use error::{MigrationError, Result};
pub use http_store::{HttpAuthProvider, HttpRecordStore};
pub use page_source::{
    DateBucketPageSource, PageNumberPageSource, PageSource, SearchAfterPageSource,
};
pub use processor::CaseMigrationProcessor;
pub use record::{CaseRecord, RecordOutcome, RunResult, SearchPage};
pub use store::{AuthProvider, EventMetadata, RecordStore, StoreError};
pub use strategy::{
    GeneralEmailCleanup, LegacyHandoffFlag, MigrationCampaign, MigrationStrategy,
};
