//! Page addressing
//!
//! Pages are numbered from 1. Page `p` covers issues starting at offset
//! `(p - 1) * size`. A checkpoint of 0 means no page has completed yet.

/// One fixed-size slice of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Page {
    /// 1-based page number
    pub index: u64,

    /// Issues per page
    pub size: u64,
}

impl Page {
    pub fn new(index: u64, size: u64) -> Self {
        Self { index, size }
    }

    /// Offset of the first issue on this page (`startAt`)
    pub fn offset(&self) -> u64 {
        self.index.saturating_sub(1).saturating_mul(self.size)
    }
}

/// Number of pages needed to cover `total_records`
pub fn total_pages(total_records: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_records.div_ceil(page_size)
}

/// Pages still to fetch after `last_completed`
///
/// Pages at or below the checkpoint are never refetched. The range is
/// empty when the checkpoint already covers every page, including a
/// checkpoint of `u64::MAX`.
pub fn pending_pages(last_completed: u64, total_pages: u64) -> impl Iterator<Item = u64> {
    last_completed
        .checked_add(1)
        .into_iter()
        .flat_map(move |first| first..=total_pages)
}
