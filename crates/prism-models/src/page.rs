//! Paginated list payloads.
//!
//! List endpoints return a [`Page`] of items plus the total page count.
//! Page numbers are zero-based on the wire.

use serde::{Deserialize, Serialize};

/// One page of a paginated listing.
///
/// # Examples
///
/// ```
/// use prism_models::Page;
///
/// let page: Page<u32> =
///     serde_json::from_str(r#"{"content":[1,2],"totalPages":3,"number":1}"#).unwrap();
/// assert!(page.has_next());
/// assert!(page.has_previous());
/// assert_eq!(page.display_number(), 2);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page.
    pub content: Vec<T>,
    /// Total number of pages available.
    #[serde(default)]
    pub total_pages: u32,
    /// Total number of items across all pages.
    #[serde(default)]
    pub total_elements: u64,
    /// Zero-based index of this page.
    #[serde(default)]
    pub number: u32,
    /// Requested page size.
    #[serde(default)]
    pub size: u32,
}

impl<T> Page<T> {
    /// Whether a later page exists.
    pub fn has_next(&self) -> bool {
        self.number.saturating_add(1) < self.total_pages
    }

    /// Whether an earlier page exists.
    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    /// Index of the next page, clamped to the last page.
    pub fn next_page(&self) -> u32 {
        if self.has_next() {
            self.number.saturating_add(1)
        } else {
            self.number
        }
    }

    /// Index of the previous page, clamped to the first page.
    pub fn previous_page(&self) -> u32 {
        self.number.saturating_sub(1)
    }

    /// One-based page number for display.
    pub fn display_number(&self) -> u32 {
        self.number.saturating_add(1)
    }

    /// Whether the page holds no items.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Page selection sent as `page` / `size` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: u32,
    /// Items per page; never zero.
    pub size: u32,
}

impl PageRequest {
    /// Build a request, bumping a zero size to one.
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.max(1),
        }
    }

    /// Query parameters in wire order.
    pub fn to_query(&self) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), self.page.to_string()),
            ("size".to_string(), self.size.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32, total_pages: u32) -> Page<u8> {
        Page {
            content: vec![],
            total_pages,
            total_elements: 0,
            number,
            size: 10,
        }
    }

    #[test]
    fn navigation_clamps_at_bounds() {
        let first = page(0, 3);
        assert!(!first.has_previous());
        assert_eq!(first.previous_page(), 0);

        let last = page(2, 3);
        assert!(!last.has_next());
        assert_eq!(last.next_page(), 2);
    }

    #[test]
    fn navigation_at_max_index_does_not_overflow() {
        let p = page(u32::MAX, u32::MAX);
        assert!(!p.has_next());
        assert_eq!(p.next_page(), u32::MAX);
        assert_eq!(p.display_number(), u32::MAX);
    }

    #[test]
    fn empty_listing_has_no_next() {
        let p = page(0, 0);
        assert!(!p.has_next());
        assert!(p.is_empty());
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let p: Page<u8> = serde_json::from_str(r#"{"content":[4]}"#).unwrap();
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.number, 0);
    }

    #[test]
    fn page_request_never_has_zero_size() {
        let req = PageRequest::new(2, 0);
        assert_eq!(req.size, 1);
        assert_eq!(
            req.to_query(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("size".to_string(), "1".to_string())
            ]
        );
    }
}
