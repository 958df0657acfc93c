//! Integration tests for the page-source implementations: resume positions,
//! exhaustion, and the guarantee that every record is yielded exactly once.

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use case_migration_core::query::match_all_query;
use case_migration_core::{DateBucketPageSource, PageNumberPageSource, PageSource, SearchAfterPageSource};

use common::{email_case, email_case_on, FakeRecordStore};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[tokio::test]
async fn search_after_source_resumes_from_last_seen_id() {
    let store = Arc::new(FakeRecordStore::new(
        [10, 20, 30, 40, 50].into_iter().map(email_case).collect(),
    ));
    let mut source = SearchAfterPageSource::new(store.clone(), match_all_query());

    let first = source.next_page("token", 2).await.expect("page");
    assert_eq!(first.iter().map(|r| r.id).collect::<Vec<_>>(), vec![10, 20]);
    assert_eq!(source.cursor().last_seen_id(), Some(20));
    assert!(!source.cursor().is_exhausted());

    let second = source.next_page("token", 2).await.expect("page");
    assert_eq!(second.iter().map(|r| r.id).collect::<Vec<_>>(), vec![30, 40]);

    let third = source.next_page("token", 2).await.expect("page");
    assert_eq!(third.iter().map(|r| r.id).collect::<Vec<_>>(), vec![50]);
    assert!(source.cursor().is_exhausted());

    // exhausted source stops issuing requests
    let calls_before = store.search_calls();
    let fourth = source.next_page("token", 2).await.expect("page");
    assert!(fourth.is_empty());
    assert_eq!(store.search_calls(), calls_before);

    let bodies = store.search_bodies();
    assert!(bodies[0].get("search_after").is_none());
    assert_eq!(bodies[1]["search_after"], json!([20]));
    assert_eq!(bodies[2]["search_after"], json!([40]));
}

#[tokio::test]
async fn search_after_total_probe_does_not_consume_the_result_set() {
    let store = Arc::new(FakeRecordStore::new(
        [10, 20, 30, 40, 50].into_iter().map(email_case).collect(),
    ));
    let mut source = SearchAfterPageSource::new(store.clone(), match_all_query());

    let total = source.total_available("token").await.expect("total");
    assert_eq!(total, 5);
    assert_eq!(source.cursor().last_seen_id(), None);

    let first = source.next_page("token", 2).await.expect("page");
    assert_eq!(first.iter().map(|r| r.id).collect::<Vec<_>>(), vec![10, 20]);
}

#[tokio::test]
async fn search_after_exact_page_multiple_needs_one_empty_fetch() {
    let store = Arc::new(FakeRecordStore::new(
        (1..=4).map(email_case).collect(),
    ));
    let mut source = SearchAfterPageSource::new(store.clone(), match_all_query());

    assert_eq!(source.next_page("token", 2).await.expect("page").len(), 2);
    assert_eq!(source.next_page("token", 2).await.expect("page").len(), 2);
    assert!(!source.cursor().is_exhausted());

    assert!(source.next_page("token", 2).await.expect("page").is_empty());
    assert!(source.cursor().is_exhausted());
    assert_eq!(store.search_calls(), 3);
}

#[tokio::test]
async fn page_number_source_yields_each_record_exactly_once() {
    let store = Arc::new(FakeRecordStore::new((1..=7).map(email_case).collect()));
    let mut source = PageNumberPageSource::new(store.clone(), match_all_query());

    assert_eq!(source.total_available("token").await.expect("total"), 7);

    let mut seen = Vec::new();
    loop {
        let page = source.next_page("token", 3).await.expect("page");
        if page.is_empty() {
            break;
        }
        seen.extend(page.iter().map(|r| r.id));
    }
    assert_eq!(seen, (1..=7).collect::<Vec<i64>>());

    // probe, then offsets 0, 3, 6; the short final page ends the walk
    let bodies = store.search_bodies();
    assert_eq!(bodies.len(), 4);
    assert_eq!(bodies[1]["from"], 0);
    assert_eq!(bodies[2]["from"], 3);
    assert_eq!(bodies[3]["from"], 6);
}

#[tokio::test]
async fn date_bucket_source_walks_days_oldest_first_and_skips_empty_days() {
    let store = Arc::new(FakeRecordStore::new(vec![
        email_case_on(1, day(2021, 3, 1)),
        email_case_on(2, day(2021, 3, 1)),
        email_case_on(3, day(2021, 3, 1)),
        email_case_on(4, day(2021, 3, 3)),
        email_case_on(5, day(2021, 3, 3)),
    ]));
    let mut source = DateBucketPageSource::new(store.clone(), day(2021, 3, 1), day(2021, 3, 3));

    let mut seen = Vec::new();
    loop {
        let page = source.next_page("token", 2).await.expect("page");
        if page.is_empty() {
            break;
        }
        seen.extend(page.iter().map(|r| r.id));
    }
    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn date_bucket_total_counts_only_the_requested_range() {
    let store = Arc::new(FakeRecordStore::new(vec![
        email_case_on(1, day(2021, 3, 1)),
        email_case_on(2, day(2021, 3, 2)),
        email_case_on(3, day(2021, 4, 15)),
    ]));
    let mut source = DateBucketPageSource::new(store.clone(), day(2021, 3, 1), day(2021, 3, 31));

    assert_eq!(source.total_available("token").await.expect("total"), 2);
}

#[tokio::test]
async fn oldest_case_seeds_the_first_day_of_the_walk() {
    // the oldest case by creation date is not the lowest id
    let store = Arc::new(FakeRecordStore::new(vec![
        email_case_on(9, day(2021, 3, 5)),
        email_case_on(12, day(2021, 3, 2)),
    ]));
    let mut source = DateBucketPageSource::from_oldest_case(store.clone(), "token", day(2021, 3, 5))
        .await
        .expect("oldest-case probe");

    let mut seen = Vec::new();
    loop {
        let page = source.next_page("token", 10).await.expect("page");
        if page.is_empty() {
            break;
        }
        seen.extend(page.iter().map(|r| r.id));
    }
    assert_eq!(seen, vec![12, 9]);
}

#[tokio::test]
async fn oldest_case_probe_on_an_empty_store_walks_nothing() {
    let store = Arc::new(FakeRecordStore::new(Vec::new()));
    let mut source = DateBucketPageSource::from_oldest_case(store.clone(), "token", day(2021, 3, 5))
        .await
        .expect("oldest-case probe");

    assert!(source.next_page("token", 10).await.expect("page").is_empty());
}

#[tokio::test]
async fn inverted_day_range_is_empty_without_touching_the_store() {
    let store = Arc::new(FakeRecordStore::new(vec![email_case_on(1, day(2021, 3, 1))]));
    let mut source = DateBucketPageSource::new(store.clone(), day(2021, 3, 10), day(2021, 3, 1));

    assert_eq!(source.total_available("token").await.expect("total"), 0);
    assert!(source.next_page("token", 5).await.expect("page").is_empty());
    assert_eq!(store.search_calls(), 0);
}
