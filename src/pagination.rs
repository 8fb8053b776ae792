//! Pagination math for note listings

use serde::Serialize;

/// Default page when none is requested
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size when none is requested
pub const DEFAULT_LIMIT: u32 = 10;

/// Largest page size a client can ask for
pub const MAX_LIMIT: u32 = 100;

/// A requested page, 1-based
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    /// The page number, starting at 1
    pub page: u32,

    /// Number of notes per page
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Create a pagination from optional request values
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE),
            limit: limit.unwrap_or(DEFAULT_LIMIT),
        }
    }

    /// Number of notes to skip
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// Pagination information served to the user
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse {
    /// The requested page, or 0 when the page holds no notes
    pub current_page: u32,

    /// Total number of pages
    pub total_pages: u64,

    /// Total number of notes matching the filter
    pub total_notes: u64,
}

impl PaginationResponse {
    /// Build the pagination metadata for a page holding `page_size` notes
    pub fn new(pagination: &Pagination, total_notes: u64, page_size: usize) -> Self {
        Self {
            current_page: if page_size == 0 { 0 } else { pagination.page },
            total_pages: total_notes.div_ceil(u64::from(pagination.limit.max(1))),
            total_notes,
        }
    }
}
