//! Offset pages and opaque base64 cursors.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use emporium_core::error::DomainError;
use emporium_projection::CursorKey;

/// Smallest permitted page size.
pub const MIN_PAGE_SIZE: u64 = 1;
/// Largest permitted page size.
pub const MAX_PAGE_SIZE: u64 = 100;

/// A sanitized offset-pagination request.
///
/// Out-of-range client input is clamped rather than rejected: a negative
/// page becomes 0 and the size is forced into
/// [`MIN_PAGE_SIZE`]..=[`MAX_PAGE_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    size: u64,
}

impl PageRequest {
    /// Builds a request from raw client input, clamping both fields.
    #[must_use]
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page: page.try_into().unwrap_or(0),
            size: size
                .try_into()
                .unwrap_or(MIN_PAGE_SIZE)
                .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE),
        }
    }

    /// Zero-based page index.
    #[must_use]
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Items per page.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Offset of the first item on this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page * self.size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 20)
    }
}

/// One offset-paginated page plus totals.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Zero-based page index.
    pub page: u64,
    /// Requested page size.
    pub size: u64,
    /// Total items across all pages.
    pub total_items: u64,
    /// Total page count at this size.
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Assembles a page from its items and the total item count.
    #[must_use]
    pub fn assemble(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            page: request.page(),
            size: request.size(),
            total_items,
            total_pages: total_items.div_ceil(request.size()),
        }
    }

    /// Whether this is the first page.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.page == 0
    }

    /// Whether this is the last page (an empty result set has one page).
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.page + 1 >= self.total_pages.max(1)
    }

    /// Whether a following page exists.
    #[must_use]
    pub fn has_next(&self) -> bool {
        !self.is_last()
    }

    /// Whether a preceding page exists.
    #[must_use]
    pub fn has_previous(&self) -> bool {
        !self.is_first()
    }
}

/// One cursor-paginated page. `next_cursor` is `None` on the final page.
#[derive(Debug, Clone)]
pub struct CursorPage<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Opaque token for the next page, if one exists.
    pub next_cursor: Option<String>,
}

/// Encodes a cursor key as an opaque URL-safe token.
#[must_use]
pub fn encode_cursor(key: &CursorKey) -> String {
    // Serialization of the key is infallible.
    let json = serde_json::to_vec(key).expect("CursorKey serialization is infallible");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decodes an opaque cursor token back into its key.
///
/// # Errors
///
/// Returns [`DomainError::Validation`] for tokens that are not valid
/// base64, not valid JSON, or not a cursor key.
pub fn decode_cursor(token: &str) -> Result<CursorKey, DomainError> {
    let invalid = || DomainError::Validation("malformed pagination cursor".into());
    let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
    serde_json::from_slice(&bytes).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{Page, PageRequest, decode_cursor, encode_cursor};
    use emporium_core::error::DomainError;
    use emporium_projection::{CursorKey, SortField};

    #[test]
    fn test_page_request_clamps_out_of_range_input() {
        let request = PageRequest::new(-3, 0);
        assert_eq!(request.page(), 0);
        assert_eq!(request.size(), 1);

        let request = PageRequest::new(2, 10_000);
        assert_eq!(request.page(), 2);
        assert_eq!(request.size(), 100);
        assert_eq!(request.offset(), 200);
    }

    #[test]
    fn test_page_totals_and_navigation_flags() {
        // 7 items at size 3: pages 0, 1, 2.
        let middle: Page<u32> = Page::assemble(vec![4, 5, 6], PageRequest::new(1, 3), 7);
        assert_eq!(middle.total_pages, 3);
        assert!(middle.has_next());
        assert!(middle.has_previous());

        let last: Page<u32> = Page::assemble(vec![7], PageRequest::new(2, 3), 7);
        assert!(last.is_last());
        assert!(!last.has_next());

        let empty: Page<u32> = Page::assemble(vec![], PageRequest::new(0, 3), 0);
        assert!(empty.is_first());
        assert!(empty.is_last());
    }

    #[test]
    fn test_cursor_round_trips_through_its_token() {
        let key = CursorKey {
            sort: SortField::PriceCents,
            value: serde_json::Value::from(4_200),
            id: Uuid::new_v4(),
        };

        let decoded = decode_cursor(&encode_cursor(&key)).unwrap();

        assert_eq!(decoded, key);
    }

    #[test]
    fn test_malformed_cursor_is_a_validation_error() {
        for token in ["not base64 %%%", "bm90IGpzb24"] {
            match decode_cursor(token) {
                Err(DomainError::Validation(_)) => {}
                other => panic!("expected Validation error, got {other:?}"),
            }
        }
    }
}
