//! Offset pagination primitives shared by the parcel marketplace backend.
//!
//! Listing endpoints page through result sets by page number and page size.
//! A [`PageRequest`] validates those inputs and derives the inclusive row
//! window handed to the store, while [`Page`] carries one window of items
//! together with the total size of the filtered set so callers can compute
//! the number of pages.
//!
//! ```
//! use pagination::{Page, PageRequest};
//!
//! let request = PageRequest::new(3, 6).expect("valid request");
//! let window = request.window();
//! assert_eq!(window.offset(), 12);
//! assert_eq!(window.last_index(), 17);
//!
//! let page = Page::new(vec!["last"], 13, request);
//! assert_eq!(page.total_pages(), 3);
//! assert!(!page.has_next());
//! ```

use serde::{Deserialize, Serialize};
use url::Url;

/// Page size applied when the caller does not provide one.
pub const DEFAULT_PAGE_SIZE: u32 = 6;

/// Largest page size accepted from callers.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Errors raised when a page request is out of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PageRequestError {
    /// Pages are numbered from one.
    #[error("page must be at least 1")]
    ZeroPage,
    /// A page must hold at least one item.
    #[error("page size must be at least 1")]
    ZeroPageSize,
    /// The requested page size exceeds [`MAX_PAGE_SIZE`].
    #[error("page size must be at most {max}")]
    PageSizeTooLarge {
        /// Largest accepted page size.
        max: u32,
    },
}

/// Validated page number and page size.
///
/// ## Invariants
/// - `page >= 1`
/// - `1 <= page_size <= MAX_PAGE_SIZE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "PageRequestDto")]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageRequestDto {
    page: u32,
    page_size: u32,
}

impl TryFrom<PageRequestDto> for PageRequest {
    type Error = PageRequestError;

    fn try_from(value: PageRequestDto) -> Result<Self, Self::Error> {
        Self::new(value.page, value.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Validate a page number and page size.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError`] when either value is out of bounds.
    pub const fn new(page: u32, page_size: u32) -> Result<Self, PageRequestError> {
        if page == 0 {
            return Err(PageRequestError::ZeroPage);
        }
        if page_size == 0 {
            return Err(PageRequestError::ZeroPageSize);
        }
        if page_size > MAX_PAGE_SIZE {
            return Err(PageRequestError::PageSizeTooLarge { max: MAX_PAGE_SIZE });
        }
        Ok(Self { page, page_size })
    }

    /// Build a request from optional query inputs, applying defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError`] when a provided value is out of bounds.
    pub fn from_optional(
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Self, PageRequestError> {
        Self::new(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Number of items per page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Row window covered by this page.
    #[must_use]
    pub const fn window(&self) -> PageWindow {
        let offset = (self.page as u64 - 1) * self.page_size as u64;
        PageWindow {
            offset,
            limit: self.page_size,
        }
    }

    /// Request for the following page with the same size.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            page_size: self.page_size,
        }
    }

    /// Request for the preceding page, if any.
    #[must_use]
    pub const fn previous(&self) -> Option<Self> {
        if self.page <= 1 {
            None
        } else {
            Some(Self {
                page: self.page - 1,
                page_size: self.page_size,
            })
        }
    }
}

/// Inclusive row range `[offset, offset + limit - 1]` addressed by a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    offset: u64,
    limit: u32,
}

impl PageWindow {
    /// Zero-based index of the first row.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Maximum number of rows in the window.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Zero-based index of the last row, inclusive.
    #[must_use]
    pub const fn last_index(&self) -> u64 {
        self.offset + self.limit as u64 - 1
    }

    /// Whether the zero-based row index falls inside the window.
    #[must_use]
    pub const fn contains(&self, index: u64) -> bool {
        index >= self.offset && index <= self.last_index()
    }
}

/// Number of pages needed to show `total_count` rows.
///
/// ```
/// assert_eq!(pagination::total_pages(13, 6), 3);
/// assert_eq!(pagination::total_pages(0, 6), 0);
/// ```
#[must_use]
pub const fn total_pages(total_count: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size as u64)
}

/// One window of items plus the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    items: Vec<T>,
    total_count: u64,
    request: PageRequest,
}

impl<T> Page<T> {
    /// Assemble a page from the store's answer.
    #[must_use]
    pub const fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            request,
        }
    }

    /// Items in this window.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the page, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Size of the filtered set regardless of the window.
    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Request that produced this page.
    #[must_use]
    pub const fn request(&self) -> PageRequest {
        self.request
    }

    /// Number of pages for the filtered set.
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        total_pages(self.total_count, self.request.page_size)
    }

    /// Whether a later page holds more rows.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        (self.request.page as u64) < self.total_pages()
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.request.page > 1
    }

    /// Transform every item while keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            request: self.request,
        }
    }

    /// Convert into the serialisable envelope returned by HTTP adapters.
    #[must_use]
    pub fn into_envelope(self) -> PageEnvelope<T> {
        let total_pages = self.total_pages();
        PageEnvelope {
            items: self.items,
            total_count: self.total_count,
            page: self.request.page,
            page_size: self.request.page_size,
            total_pages,
        }
    }
}

/// Wire representation of a [`Page`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    /// Items in this window.
    pub items: Vec<T>,
    /// Size of the filtered set.
    pub total_count: u64,
    /// One-based page number.
    pub page: u32,
    /// Items per page.
    pub page_size: u32,
    /// Number of pages for the filtered set.
    pub total_pages: u64,
}

/// Navigation links for a page, derived from the request URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLinks {
    /// Link to the current page.
    #[serde(rename = "self")]
    pub current: String,
    /// Link to the next page, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Link to the previous page, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}

impl PageLinks {
    /// Build links by rewriting the `page` and `pageSize` query parameters of
    /// `base` while keeping every other parameter.
    ///
    /// ```
    /// use pagination::{Page, PageLinks, PageRequest};
    /// use url::Url;
    ///
    /// let base = Url::parse("http://localhost/api/v1/parcels?maxPrice=50").expect("url");
    /// let page = Page::new(vec![1, 2], 13, PageRequest::new(2, 6).expect("request"));
    /// let links = PageLinks::for_page(&base, &page);
    /// assert!(links.next.expect("next").contains("page=3"));
    /// assert!(links.current.contains("maxPrice=50"));
    /// ```
    #[must_use]
    pub fn for_page<T>(base: &Url, page: &Page<T>) -> Self {
        let request = page.request();
        let next = page.has_next().then(|| link_to(base, request.next()));
        let prev = request.previous().map(|previous| link_to(base, previous));
        Self {
            current: link_to(base, request),
            next,
            prev,
        }
    }
}

fn link_to(base: &Url, request: PageRequest) -> String {
    let mut url = base.clone();
    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != "page" && key != "pageSize")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &retained {
            pairs.append_pair(key, value);
        }
        pairs.append_pair("page", &request.page().to_string());
        pairs.append_pair("pageSize", &request.page_size().to_string());
    }
    url.into()
}
