use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page metadata returned alongside every listing.
///
/// Out-of-range pages are clamped: page 0 becomes 1, and a page past the
/// end becomes the last page, so a client whose last item was deleted
/// lands on a page that still has content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn resolve(requested_page: Option<u32>, requested_limit: Option<u32>, total: u64) -> Self {
        let limit = requested_limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let total_pages = total.div_ceil(limit as u64).max(1);
        let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);
        let page = requested_page.unwrap_or(1).clamp(1, total_pages);

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// Row offset for LIMIT/OFFSET queries
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

/// A page of notes
#[derive(Debug, Serialize)]
pub struct NotePage<T> {
    pub notes: Vec<T>,
    pub pagination: Pagination,
}
