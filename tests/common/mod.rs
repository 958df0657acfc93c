//! Shared test support: an in-memory record store that understands the
//! search bodies the crate builds, plus record factories.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{json, Map, Value};

use case_migration_core::{
    CaseMigrationProcessor, CaseRecord, EventMetadata, GeneralEmailCleanup, RecordStore,
    SearchPage, StoreError,
};

/// In-memory [`RecordStore`] that serves pages from a sorted case map and
/// records every call for assertions. Update failures and search faults are
/// injected per test.
pub struct FakeRecordStore {
    cases: Mutex<BTreeMap<i64, CaseRecord>>,
    failing_updates: HashSet<i64>,
    /// 1-based search call number that fails with a transport error.
    fail_search_call: Option<usize>,
    search_calls: AtomicUsize,
    update_calls: AtomicUsize,
    search_bodies: Mutex<Vec<Value>>,
    updates: Mutex<Vec<(i64, Map<String, Value>)>>,
}

impl FakeRecordStore {
    pub fn new(cases: Vec<CaseRecord>) -> Self {
        Self {
            cases: Mutex::new(cases.into_iter().map(|case| (case.id, case)).collect()),
            failing_updates: HashSet::new(),
            fail_search_call: None,
            search_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            search_bodies: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn with_failing_updates(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.failing_updates = ids.into_iter().collect();
        self
    }

    /// Make the nth search call (1-based) fail with a transport error.
    pub fn with_failing_search_call(mut self, call: usize) -> Self {
        self.fail_search_call = Some(call);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn search_bodies(&self) -> Vec<Value> {
        self.search_bodies.lock().expect("lock poisoned").clone()
    }

    pub fn updated_ids(&self) -> Vec<i64> {
        self.updates
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    fn matches(filter: &Value, record: &CaseRecord) -> bool {
        if filter.get("match_all").is_some() {
            return true;
        }
        if let Some(range) = filter.pointer("/range/created_date") {
            let day = match record.created_date {
                Some(created) => created.date_naive().format("%Y-%m-%d").to_string(),
                None => return false,
            };
            let gte = range["gte"].as_str().unwrap_or("0000-00-00");
            let lte = range["lte"].as_str().unwrap_or("9999-99-99");
            return day.as_str() >= gte && day.as_str() <= lte;
        }
        if let Some(must) = filter.pointer("/bool/must").and_then(Value::as_array) {
            return must.iter().all(|clause| {
                match clause
                    .pointer("/match/created_date")
                    .and_then(Value::as_str)
                {
                    Some(day) => record
                        .created_date
                        .map(|created| created.date_naive().format("%Y-%m-%d").to_string() == day)
                        .unwrap_or(false),
                    None => true,
                }
            });
        }
        if let Some(should) = filter.pointer("/bool/should").and_then(Value::as_array) {
            return should.iter().any(|clause| {
                clause
                    .pointer("/exists/field")
                    .and_then(Value::as_str)
                    .map(|field| record.data.contains_key(field))
                    .unwrap_or(false)
            });
        }
        if let Some(must_not) = filter.pointer("/bool/must_not").and_then(Value::as_array) {
            return must_not.iter().all(|clause| {
                clause
                    .pointer("/exists/field")
                    .and_then(Value::as_str)
                    .map(|field| !record.data.contains_key(field))
                    .unwrap_or(true)
            });
        }
        true
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn fetch_one(&self, _token: &str, case_id: i64) -> Result<CaseRecord, StoreError> {
        self.cases
            .lock()
            .expect("lock poisoned")
            .get(&case_id)
            .cloned()
            .ok_or(StoreError::NotFound { case_id })
    }

    async fn search_page(&self, _token: &str, body: &Value) -> Result<SearchPage, StoreError> {
        let call = self.search_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.search_bodies
            .lock()
            .expect("lock poisoned")
            .push(body.clone());

        if self.fail_search_call == Some(call) {
            return Err(StoreError::Transport("injected search fault".to_string()));
        }

        let size = body["size"].as_u64().unwrap_or(10) as usize;
        let filter = &body["query"];

        let cases = self.cases.lock().expect("lock poisoned");
        let mut matching: Vec<CaseRecord> = cases
            .values()
            .filter(|record| Self::matches(filter, record))
            .cloned()
            .collect();
        let total = matching.len() as u64;

        // default order is by reference; the oldest-case probe sorts by date
        if body.pointer("/sort/0/created_date").is_some() {
            matching.sort_by_key(|record| record.created_date);
        }

        let records: Vec<CaseRecord> =
            if let Some(last_seen) = body.pointer("/search_after/0").and_then(Value::as_i64) {
                matching
                    .into_iter()
                    .filter(|record| record.id > last_seen)
                    .take(size)
                    .collect()
            } else {
                let from = body["from"].as_u64().unwrap_or(0) as usize;
                matching.into_iter().skip(from).take(size).collect()
            };

        Ok(SearchPage { records, total })
    }

    async fn update(
        &self,
        _token: &str,
        case_id: i64,
        _event: &EventMetadata,
        data: Map<String, Value>,
    ) -> Result<CaseRecord, StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_updates.contains(&case_id) {
            return Err(StoreError::Rejected {
                status: 422,
                message: "event submission rejected".to_string(),
            });
        }
        self.updates
            .lock()
            .expect("lock poisoned")
            .push((case_id, data.clone()));
        Ok(CaseRecord::new(case_id, data))
    }
}

/// A case the general-email cleanup campaign accepts.
pub fn email_case(id: i64) -> CaseRecord {
    let Value::Object(data) = json!({
        "generalEmailBody": format!("body for {id}"),
        "applicationType": "Personal",
    }) else {
        unreachable!()
    };
    CaseRecord::new(id, data)
}

/// A case the general-email cleanup campaign skips.
pub fn clean_case(id: i64) -> CaseRecord {
    let Value::Object(data) = json!({ "applicationType": "Personal" }) else {
        unreachable!()
    };
    CaseRecord::new(id, data)
}

pub fn email_case_on(id: i64, day: NaiveDate) -> CaseRecord {
    let mut record = email_case(id);
    record.created_date = Some(
        Utc.from_utc_datetime(&day.and_hms_opt(10, 0, 0).expect("valid time")),
    );
    record
}

/// Sequentially-numbered accepted cases starting at id 1.
pub fn seeded_store(count: usize) -> Arc<FakeRecordStore> {
    Arc::new(FakeRecordStore::new(
        (1..=count as i64).map(email_case).collect(),
    ))
}

/// Processor wired with the cleanup strategy, no heartbeat, given workers.
pub fn processor(store: Arc<FakeRecordStore>, workers: usize) -> CaseMigrationProcessor {
    CaseMigrationProcessor::new(
        store,
        Arc::new(GeneralEmailCleanup),
        EventMetadata::default(),
        workers,
        0,
    )
}
