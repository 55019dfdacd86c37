//! Pagination utilities
//!
//! Pages are 1-indexed; offset = (page - 1) * page_size.

use serde::Serialize;

/// A sanitized page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number (1-indexed)
    pub page: u64,
    /// Items per page (at least 1)
    pub page_size: u64,
}

impl PageRequest {
    /// Build a request from untrusted query values
    ///
    /// Missing or non-positive values fall back to page 1 and
    /// `default_page_size`; the page size is capped at `max_page_size`.
    pub fn from_query(
        page: Option<i64>,
        page_size: Option<i64>,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Self {
        let page = page.filter(|p| *p >= 1).map(|p| p as u64).unwrap_or(1);
        let page_size = page_size
            .filter(|s| *s >= 1)
            .map(|s| s as u64)
            .unwrap_or(default_page_size)
            .clamp(1, max_page_size.max(1));

        Self { page, page_size }
    }

    /// Number of items to skip
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// Pagination metadata returned alongside a page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_events: u64,
    pub page_size: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Calculate pagination metadata from total results and the requested page
///
/// The requested page is reported as-is even when it lies past the last
/// page; such a page is simply empty.
///
/// # Examples
/// ```
/// use herbtrace_ledger::pagination::{calculate_pagination, PageRequest};
///
/// // 25 total results at 10 per page = 3 pages (10 + 10 + 5)
/// let p = calculate_pagination(25, PageRequest { page: 2, page_size: 10 });
/// assert_eq!(p.total_pages, 3);
/// assert!(p.has_next);
/// assert!(p.has_prev);
/// ```
pub fn calculate_pagination(total_results: u64, request: PageRequest) -> Pagination {
    let total_pages = total_results.div_ceil(request.page_size);

    Pagination {
        current_page: request.page,
        total_pages,
        total_events: total_results,
        page_size: request.page_size,
        has_next: request.page < total_pages,
        has_prev: request.page > 1,
    }
}
