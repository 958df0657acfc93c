//! # Pagination Cursor and Processing Limit
//!
//! Value types driving the fetch loop: the "search-after" resume position and
//! the per-run ceiling on how many records may be dispatched.

use crate::record::CaseRecord;

/// Resume position into a sorted, server-paginated result set.
///
/// Advances monotonically by the id of the last record in the most recently
/// fetched page and is never reset mid-run. A page shorter than requested
/// (including an empty one) marks the cursor exhausted; the fetch loop stops
/// on exhaustion regardless of any remaining limit headroom.
#[derive(Debug, Clone, Default)]
pub struct PaginationCursor {
    last_seen_id: Option<i64>,
    exhausted: bool,
}

impl PaginationCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen_id(&self) -> Option<i64> {
        self.last_seen_id
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Advance past a fetched page.
    ///
    /// `requested` is the page size that was asked for; a shorter reply means
    /// the underlying set has no further pages.
    pub fn advance(&mut self, page: &[CaseRecord], requested: usize) {
        if let Some(last) = page.last() {
            self.last_seen_id = Some(last.id);
        }
        if page.len() < requested {
            self.exhausted = true;
        }
    }
}

/// Per-run ceiling on dispatched records.
///
/// Fixed once at run start from caller input plus the backend-reported total;
/// the loop never re-queries the total mid-run.
#[derive(Debug, Clone, Copy)]
pub struct ProcessingLimit {
    requested_max: Option<usize>,
    page_size: usize,
}

impl ProcessingLimit {
    /// A requested max of zero means "no explicit cap".
    pub fn new(requested_max: Option<usize>, page_size: usize) -> Self {
        Self {
            requested_max: requested_max.filter(|max| *max > 0),
            page_size,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Effective ceiling for this run given the backend-reported total.
    pub fn effective(&self, total_available: u64) -> usize {
        let total = usize::try_from(total_available).unwrap_or(usize::MAX);
        match self.requested_max {
            Some(max) => max.min(total),
            None => total,
        }
    }

    /// Size of the next page request, shrunk near the ceiling so the run
    /// never dispatches past it.
    pub fn next_page_size(&self, seen: usize, effective: usize) -> usize {
        self.page_size.min(effective.saturating_sub(seen))
    }
}
