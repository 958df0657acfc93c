//! # Page Sources
//!
//! One dispatch loop, several ways of walking a result set. A [`PageSource`]
//! owns its resume state and yields pages until the set is exhausted; the
//! search-after cursor is the primary implementation, with page-number and
//! date-bucket walks covering the backends that cannot sort-stably resume.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crate::cursor::PaginationCursor;
use crate::query::{self, SearchQuery};
use crate::record::CaseRecord;
use crate::store::{RecordStore, StoreError};

/// A paged view over an unbounded, server-side result set.
///
/// `next_page` returns an empty vec once the set is exhausted and keeps
/// returning empty thereafter; the caller never needs page-count arithmetic.
#[async_trait]
pub trait PageSource: Send {
    /// Bounded probe for the backend-reported total. Issued once at run start
    /// and never re-queried; must not consume any of the result set.
    async fn total_available(&mut self, token: &str) -> Result<u64, StoreError>;

    /// Fetch the next page of at most `page_size` records.
    async fn next_page(
        &mut self,
        token: &str,
        page_size: usize,
    ) -> Result<Vec<CaseRecord>, StoreError>;
}

/// Search-after pagination: stable ascending sort on the reference key, with
/// the last-seen record id as the resume position.
pub struct SearchAfterPageSource {
    store: Arc<dyn RecordStore>,
    filter: Value,
    cursor: PaginationCursor,
}

impl SearchAfterPageSource {
    pub fn new(store: Arc<dyn RecordStore>, filter: Value) -> Self {
        Self {
            store,
            filter,
            cursor: PaginationCursor::new(),
        }
    }

    pub fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }
}

#[async_trait]
impl PageSource for SearchAfterPageSource {
    async fn total_available(&mut self, token: &str) -> Result<u64, StoreError> {
        let probe = SearchQuery::initial(self.filter.clone(), 1).body();
        let page = self.store.search_page(token, &probe).await?;
        Ok(page.total)
    }

    async fn next_page(
        &mut self,
        token: &str,
        page_size: usize,
    ) -> Result<Vec<CaseRecord>, StoreError> {
        if self.cursor.is_exhausted() {
            return Ok(Vec::new());
        }
        let body = match self.cursor.last_seen_id() {
            None => SearchQuery::initial(self.filter.clone(), page_size),
            Some(last_seen_id) => {
                SearchQuery::search_after(self.filter.clone(), page_size, last_seen_id)
            }
        }
        .body();

        let page = self.store.search_page(token, &body).await?;
        self.cursor.advance(&page.records, page_size);
        Ok(page.records)
    }
}

/// From/size pagination over a fixed filter, for backends without a stable
/// search-after key. Assumes the underlying set does not shift mid-run.
pub struct PageNumberPageSource {
    store: Arc<dyn RecordStore>,
    filter: Value,
    offset: usize,
    exhausted: bool,
}

impl PageNumberPageSource {
    pub fn new(store: Arc<dyn RecordStore>, filter: Value) -> Self {
        Self {
            store,
            filter,
            offset: 0,
            exhausted: false,
        }
    }
}

#[async_trait]
impl PageSource for PageNumberPageSource {
    async fn total_available(&mut self, token: &str) -> Result<u64, StoreError> {
        let probe = query::offset_page_query(&self.filter, 0, 1);
        let page = self.store.search_page(token, &probe).await?;
        Ok(page.total)
    }

    async fn next_page(
        &mut self,
        token: &str,
        page_size: usize,
    ) -> Result<Vec<CaseRecord>, StoreError> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        let body = query::offset_page_query(&self.filter, self.offset, page_size);
        let page = self.store.search_page(token, &body).await?;

        if page.records.len() < page_size {
            self.exhausted = true;
        }
        self.offset += page.records.len();
        Ok(page.records)
    }
}

/// Day-bucketed pagination: walks an inclusive day range oldest-first and
/// pages within each day by offset. Empty days are skipped transparently.
pub struct DateBucketPageSource {
    store: Arc<dyn RecordStore>,
    first: NaiveDate,
    last: NaiveDate,
    days: Vec<NaiveDate>,
    day_index: usize,
    offset: usize,
}

impl DateBucketPageSource {
    pub fn new(store: Arc<dyn RecordStore>, first: NaiveDate, last: NaiveDate) -> Self {
        let days: Vec<NaiveDate> = first.iter_days().take_while(|day| *day <= last).collect();
        Self {
            store,
            first,
            last,
            days,
            day_index: 0,
            offset: 0,
        }
    }

    /// Resolve the first day of the walk from the oldest case in the store.
    ///
    /// An empty store yields a one-day walk over `last`, which pages as empty.
    pub async fn from_oldest_case(
        store: Arc<dyn RecordStore>,
        token: &str,
        last: NaiveDate,
    ) -> Result<Self, StoreError> {
        let probe = query::oldest_case_query();
        let page = store.search_page(token, &probe).await?;
        let first = page
            .records
            .first()
            .and_then(|record| record.created_date)
            .map(|created| created.date_naive())
            .unwrap_or(last);
        Ok(Self::new(store, first, last))
    }
}

#[async_trait]
impl PageSource for DateBucketPageSource {
    async fn total_available(&mut self, token: &str) -> Result<u64, StoreError> {
        if self.days.is_empty() {
            return Ok(0);
        }
        let probe = SearchQuery::initial(query::date_range_query(self.first, self.last), 1).body();
        let page = self.store.search_page(token, &probe).await?;
        Ok(page.total)
    }

    async fn next_page(
        &mut self,
        token: &str,
        page_size: usize,
    ) -> Result<Vec<CaseRecord>, StoreError> {
        while self.day_index < self.days.len() {
            let day = self.days[self.day_index];
            let body = query::date_page_query(day, self.offset, page_size);
            let page = self.store.search_page(token, &body).await?;

            if page.records.is_empty() {
                self.day_index += 1;
                self.offset = 0;
                continue;
            }
            if page.records.len() < page_size {
                // day drained, resume with the next one
                self.day_index += 1;
                self.offset = 0;
            } else {
                self.offset += page.records.len();
            }
            return Ok(page.records);
        }
        Ok(Vec::new())
    }
}
