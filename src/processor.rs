//! # Case Migration Processor
//!
//! The fetch-dispatch-aggregate core. Page fetching is strictly sequential —
//! a single control task owns the page source and its resume state — while
//! record processing fans out to a bounded worker pool. The two never race
//! over the cursor, and the aggregator is the only shared mutable state.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::aggregator::ResultAggregator;
use crate::cursor::ProcessingLimit;
use crate::error::{MigrationError, Result};
use crate::logging::log_case_operation;
use crate::page_source::PageSource;
use crate::record::{CaseRecord, RecordOutcome, RunResult};
use crate::store::{EventMetadata, RecordStore};
use crate::strategy::MigrationStrategy;

/// Drives a migration run: the paginated dispatch loop, the single-case path,
/// and the per-record update primitive both share.
///
/// Cheap to clone; clones share the same aggregator, store, and strategy, so
/// worker tasks each carry a clone into their closures.
#[derive(Clone)]
pub struct CaseMigrationProcessor {
    store: Arc<dyn RecordStore>,
    strategy: Arc<dyn MigrationStrategy>,
    aggregator: Arc<ResultAggregator>,
    event: EventMetadata,
    worker_count: usize,
}

impl CaseMigrationProcessor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        strategy: Arc<dyn MigrationStrategy>,
        event: EventMetadata,
        worker_count: usize,
        heartbeat_every: u64,
    ) -> Self {
        Self {
            store,
            strategy,
            aggregator: Arc::new(ResultAggregator::new(heartbeat_every)),
            event,
            worker_count: worker_count.max(1),
        }
    }

    pub fn aggregator(&self) -> &ResultAggregator {
        &self.aggregator
    }

    /// Run the paginated sweep.
    ///
    /// Semantics, in order: probe the total (an empty set is success, not an
    /// error); fix the effective limit once; process the first record of the
    /// first page synchronously so the resume position is anchored before any
    /// worker starts; then fetch pages sequentially and submit each whole
    /// page as one unit of work. Exhaustion beats the limit, a page-fetch
    /// fault ends fetching early, and the pool always drains before the
    /// snapshot is taken.
    #[instrument(skip(self, source, token), fields(dry_run = dry_run, workers = self.worker_count))]
    pub async fn run(
        &self,
        token: &str,
        source: &mut dyn PageSource,
        limit: &ProcessingLimit,
        dry_run: bool,
    ) -> Result<RunResult> {
        let total = match source.total_available(token).await {
            Ok(total) => total,
            Err(e) => {
                error!(error = %e, "total probe failed, aborting sweep before dispatch");
                return Ok(self.aggregator.snapshot());
            }
        };
        if total == 0 {
            info!("no cases matched the migration query");
            return Ok(self.aggregator.snapshot());
        }

        let effective = limit.effective(total);
        info!(
            total_available = total,
            effective_limit = effective,
            page_size = limit.page_size(),
            "migration sweep started"
        );

        let mut seen: usize = 0;
        let mut first_page = match source
            .next_page(token, limit.next_page_size(seen, effective))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                error!(error = %e, "first page fetch failed, treating as exhaustion");
                return Ok(self.aggregator.snapshot());
            }
        };
        if first_page.is_empty() {
            info!("result set empty despite non-zero total, nothing to do");
            return Ok(self.aggregator.snapshot());
        }

        // Anchor record: completed on the control task before the pool exists,
        // so no worker ever observes an unseeded resume position.
        let anchor = first_page.remove(0);
        debug!(case_id = anchor.id, "processing anchor record");
        self.aggregator.increment_seen();
        seen += 1;
        self.update_case(token, anchor, dry_run).await;

        let semaphore = Arc::new(Semaphore::new(self.worker_count));
        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        if !first_page.is_empty() {
            seen += first_page.len();
            self.submit_page(&mut handles, &semaphore, token, first_page, dry_run);
        }

        while seen < effective {
            let request = limit.next_page_size(seen, effective);
            let page = match source.next_page(token, request).await {
                Ok(page) => page,
                Err(e) => {
                    error!(error = %e, "page fetch failed, treating as exhaustion");
                    break;
                }
            };
            if page.is_empty() {
                debug!(seen = seen, "result set exhausted");
                break;
            }
            seen += page.len();
            self.submit_page(&mut handles, &semaphore, token, page, dry_run);
        }

        // Graceful drain: in-flight updates always run to completion.
        let mut join_failures = 0usize;
        for join_result in futures::future::join_all(handles).await {
            if let Err(e) = join_result {
                join_failures += 1;
                error!(error = %e, "page worker task did not complete");
            }
        }
        if join_failures > 0 {
            return Err(MigrationError::Interrupted(format!(
                "{join_failures} page worker task(s) did not complete"
            )));
        }

        let result = self.aggregator.snapshot();
        info!(
            seen = result.total_seen,
            migrated = result.migrated_ids.len(),
            failed = result.failed_ids.len(),
            "migration sweep finished"
        );
        Ok(result)
    }

    /// Submit one fetched page to the pool as a single unit of work. Each
    /// record is counted as seen here, at dispatch time.
    fn submit_page(
        &self,
        handles: &mut Vec<JoinHandle<()>>,
        semaphore: &Arc<Semaphore>,
        token: &str,
        records: Vec<CaseRecord>,
        dry_run: bool,
    ) {
        for record in &records {
            debug!(case_id = record.id, "submitting case for migration");
            self.aggregator.increment_seen();
        }

        let processor = self.clone();
        let semaphore = Arc::clone(semaphore);
        let token = token.to_string();

        handles.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!("worker pool semaphore closed before page could run");
                    return;
                }
            };
            for record in records {
                processor.update_case(&token, record, dry_run).await;
            }
        }));
    }

    /// The one-off, non-paginated path: fetch one case by id and run it
    /// through the shared update primitive. A case that cannot even be
    /// located is logged and excluded from both outcome sets.
    #[instrument(skip(self, token), fields(dry_run = dry_run))]
    pub async fn process_single_case(&self, token: &str, case_id: i64, dry_run: bool) {
        let record = match self.store.fetch_one(token, case_id).await {
            Ok(record) => record,
            Err(e) => {
                error!(case_id = case_id, error = %e, "case could not be fetched");
                return;
            }
        };
        self.aggregator.increment_seen();
        self.update_case(token, record, dry_run).await;
    }

    /// Per-record update primitive shared by the dispatch loop and the
    /// single-case path. One record's failure never aborts the run: store
    /// errors are recorded against the id and swallowed here.
    ///
    /// Dry-run policy: the record is recorded as migrated ("would succeed")
    /// without any backend write.
    async fn update_case(&self, token: &str, record: CaseRecord, dry_run: bool) {
        let case_id = record.id;
        let case_type = record.case_type_id.clone();

        if !self.strategy.accepts(&record) {
            log_case_operation(
                "migrate",
                Some(case_id),
                case_type.as_deref(),
                "skipped",
                Some("case does not meet criteria for migration"),
            );
            return;
        }

        let migrated_data = self.strategy.migrate(record.data);

        if dry_run {
            log_case_operation(
                "migrate",
                Some(case_id),
                case_type.as_deref(),
                "dry_run",
                Some("update submission skipped"),
            );
            self.aggregator.record_outcome(RecordOutcome::Migrated(case_id));
            return;
        }

        match self
            .store
            .update(token, case_id, &self.event, migrated_data)
            .await
        {
            Ok(_) => {
                log_case_operation(
                    "migrate",
                    Some(case_id),
                    case_type.as_deref(),
                    "completed",
                    None,
                );
                self.aggregator.record_outcome(RecordOutcome::Migrated(case_id));
            }
            Err(e) => {
                warn!(case_id = case_id, error = %e, "case update failed");
                self.aggregator.record_failure(case_id, e.to_string());
            }
        }
    }
}
