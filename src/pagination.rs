//! Page-number pagination for the poll listing.

use serde::{Deserialize, Serialize};

/// Default page size when `per_page` is not specified.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    /// 1-based page number.
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Effective page size, clamped to [1, MAX_PAGE_SIZE].
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.per_page())
    }

    /// Rows to fetch: one extra tells whether another page exists.
    pub fn fetch_limit(&self) -> u64 {
        u64::from(self.per_page()) + 1
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    /// Build a page from up to `fetch_limit()` rows.
    pub fn from_overfetch(mut rows: Vec<T>, params: &PageParams) -> Self {
        let per_page = params.per_page();
        let has_more = rows.len() > per_page as usize;
        rows.truncate(per_page as usize);
        Page {
            items: rows,
            page: params.page(),
            per_page,
            next_page: has_more.then(|| params.page() + 1),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            next_page: self.next_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<u32>, per_page: Option<u32>) -> PageParams {
        PageParams { page, per_page }
    }

    #[test]
    fn defaults() {
        let p = params(None, None);
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), DEFAULT_PAGE_SIZE);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn clamps_page_size_and_page_number() {
        assert_eq!(params(None, Some(5000)).per_page(), MAX_PAGE_SIZE);
        assert_eq!(params(None, Some(0)).per_page(), 1);
        assert_eq!(params(Some(0), None).page(), 1);
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(params(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn next_page_only_when_overfetched() {
        let p = params(Some(2), Some(3));
        let full = Page::from_overfetch(vec![1, 2, 3, 4], &p);
        assert_eq!(full.items, vec![1, 2, 3]);
        assert_eq!(full.next_page, Some(3));

        let last = Page::from_overfetch(vec![1, 2], &p);
        assert_eq!(last.items, vec![1, 2]);
        assert_eq!(last.next_page, None);
    }
}
