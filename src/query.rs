//! # Search Query Builders
//!
//! Builders for the JSON search bodies sent verbatim to the record store.
//! Results are always sorted ascending on the reference keyword so that the
//! last-seen id of a page unambiguously identifies the resume position.

use chrono::NaiveDate;
use serde_json::{json, Value};

const REFERENCE_KEYWORD: &str = "reference.keyword";
const CREATED_DATE: &str = "created_date";

/// Description of one paged search: filter, page size, and optional
/// search-after resume position. Built once per migration intent and
/// re-issued with an advancing cursor.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    filter: Value,
    size: usize,
    search_after: Option<i64>,
}

impl SearchQuery {
    /// First page of a run: no resume position.
    pub fn initial(filter: Value, size: usize) -> Self {
        Self {
            filter,
            size,
            search_after: None,
        }
    }

    /// Subsequent page, resuming after the given record id.
    pub fn search_after(filter: Value, size: usize, last_seen_id: i64) -> Self {
        Self {
            filter,
            size,
            search_after: Some(last_seen_id),
        }
    }

    /// Render the request body.
    pub fn body(&self) -> Value {
        let mut body = json!({
            "query": self.filter,
            "sort": [{ REFERENCE_KEYWORD: "asc" }],
            "size": self.size,
        });
        if let Some(last_seen_id) = self.search_after {
            body["search_after"] = json!([last_seen_id]);
        }
        body
    }
}

/// Filter matching cases where the given data field is absent.
pub fn missing_field_query(field: &str) -> Value {
    json!({
        "bool": {
            "must_not": [
                { "exists": { "field": field } }
            ]
        }
    })
}

/// Filter matching cases where any of the given data fields is present.
pub fn exists_any_query(fields: &[&str]) -> Value {
    let clauses: Vec<Value> = fields
        .iter()
        .map(|field| json!({ "exists": { "field": field } }))
        .collect();
    json!({
        "bool": {
            "should": clauses,
            "minimum_should_match": 1
        }
    })
}

pub fn match_all_query() -> Value {
    json!({ "match_all": {} })
}

/// Probe for the oldest case in the store (size 1, ascending creation date).
pub fn oldest_case_query() -> Value {
    json!({
        "query": { "match_all": {} },
        "sort": [{ CREATED_DATE: "asc" }],
        "size": 1,
    })
}

/// One page of the cases created on a given day, addressed by page number.
pub fn date_page_query(day: NaiveDate, from: usize, size: usize) -> Value {
    json!({
        "query": {
            "bool": {
                "must": [
                    { "match": { CREATED_DATE: day.format("%Y-%m-%d").to_string() } }
                ]
            }
        },
        "sort": [{ REFERENCE_KEYWORD: "asc" }],
        "from": from,
        "size": size,
    })
}

/// All cases created within an inclusive day range; used for total probes of
/// date-bucketed sweeps.
pub fn date_range_query(first: NaiveDate, last: NaiveDate) -> Value {
    json!({
        "range": {
            CREATED_DATE: {
                "gte": first.format("%Y-%m-%d").to_string(),
                "lte": last.format("%Y-%m-%d").to_string(),
            }
        }
    })
}

/// One page of a fixed filter addressed by offset rather than cursor.
pub fn offset_page_query(filter: &Value, from: usize, size: usize) -> Value {
    json!({
        "query": filter,
        "sort": [{ REFERENCE_KEYWORD: "asc" }],
        "from": from,
        "size": size,
    })
}
