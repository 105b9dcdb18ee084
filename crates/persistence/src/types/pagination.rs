//! Pagination types for search results.
//!
//! Collections are paged by offset. [`Pagination`] describes the requested
//! window and [`PageResult`] carries one page of matches plus the total.

use serde::{Deserialize, Serialize};

use super::StoredResource;

/// Default page size when neither the request nor the server sets one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Hard upper bound on a single page.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Server-side bounds applied to requested page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    /// Page size used when the request has no `_count`.
    pub default_count: usize,
    /// Largest page size a request may ask for.
    pub max_count: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_count: DEFAULT_PAGE_SIZE,
            max_count: MAX_PAGE_SIZE,
        }
    }
}

impl PageLimits {
    /// Default page size with no upper bound. A count that is already set
    /// passes through unchanged.
    pub fn uncapped() -> Self {
        Self {
            default_count: DEFAULT_PAGE_SIZE,
            max_count: usize::MAX,
        }
    }
}

/// Offset-based pagination for a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of results to return.
    pub count: usize,

    /// Number of matches to skip.
    pub offset: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            count: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Creates pagination with the given count and offset zero.
    pub fn new(count: usize) -> Self {
        Self { count, offset: 0 }
    }

    /// Sets the offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Builds pagination from requested values, applying the limits.
    ///
    /// A missing count falls back to the default; a count above the maximum
    /// is clamped to it.
    pub fn from_request(count: Option<usize>, offset: Option<usize>, limits: PageLimits) -> Self {
        let count = count
            .unwrap_or(limits.default_count)
            .min(limits.max_count);
        Self {
            count,
            offset: offset.unwrap_or(0),
        }
    }

    /// Returns the window after this one, if `total` has matches past it.
    ///
    /// A zero count has no next page, and neither does a window whose end
    /// does not fit in `usize`.
    pub fn next_page(&self, total: usize) -> Option<Pagination> {
        if self.count == 0 {
            return None;
        }
        let next = self.offset.checked_add(self.count)?;
        (next < total).then(|| self.with_offset(next))
    }

    /// Returns the window before this one, if this one does not start at zero.
    pub fn previous_page(&self) -> Option<Pagination> {
        (self.offset > 0).then(|| self.with_offset(self.offset.saturating_sub(self.count)))
    }
}

/// One page of search matches.
#[derive(Debug, Clone)]
pub struct PageResult {
    /// The matches on this page, in result order.
    pub items: Vec<StoredResource>,

    /// Total number of matches across all pages.
    pub total: usize,

    /// The window this page was cut with.
    pub pagination: Pagination,
}
