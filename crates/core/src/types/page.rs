//! Offset pagination shared by list endpoints.

use serde::{Deserialize, Serialize};

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    /// Largest page size a client may ask for.
    pub const MAX_SIZE: u32 = 100;

    /// Build a request from optional query values.
    ///
    /// A missing or zero size falls back to `default_size`; oversized requests
    /// are clamped to [`Self::MAX_SIZE`].
    #[must_use]
    pub fn new(page: Option<u32>, size: Option<u32>, default_size: u32) -> Self {
        let size = match size {
            Some(0) | None => default_size,
            Some(s) => s,
        }
        .min(Self::MAX_SIZE);
        Self {
            page: page.unwrap_or(0),
            size,
        }
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size.max(1));
        let total_pages = total_elements.div_ceil(size);
        let page = request.page;
        Self {
            content,
            page,
            size: request.size,
            total_elements,
            total_pages,
            first: page == 0,
            last: u64::from(page) + 1 >= total_pages,
        }
    }

    /// Convert each element, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let req = PageRequest::new(None, None, 12);
        assert_eq!(req, PageRequest { page: 0, size: 12 });
        assert_eq!(PageRequest::new(Some(1), Some(0), 20).size, 20);
    }

    #[test]
    fn test_page_request_clamps_size() {
        assert_eq!(PageRequest::new(None, Some(5000), 20).size, 100);
    }

    #[test]
    fn test_offset() {
        let req = PageRequest::new(Some(3), Some(20), 20);
        assert_eq!(req.offset(), 60);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn test_page_totals() {
        let page = Page::new(vec![1, 2, 3], PageRequest::new(Some(0), Some(3), 3), 7);
        assert_eq!(page.total_pages, 3);
        assert!(page.first);
        assert!(!page.last);

        let last = Page::new(vec![7], PageRequest::new(Some(2), Some(3), 3), 7);
        assert!(last.last);
        assert!(!last.first);
    }

    #[test]
    fn test_empty_page() {
        let page: Page<i32> = Page::new(vec![], PageRequest::new(None, None, 10), 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.first);
        assert!(page.last);
    }

    #[test]
    fn test_serializes_camel_case() {
        let page = Page::new(vec!["a"], PageRequest::new(None, None, 10), 1);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalElements"], 1);
        assert_eq!(json["totalPages"], 1);
        assert_eq!(json["content"][0], "a");
    }
}
