//! Page arithmetic shared by every listing
//!
//! The requested page number comes straight from the `page` query parameter
//! and is never trusted: missing or unparsable values select the first page,
//! numbers below one clamp to the first page and numbers past the end clamp
//! to the last one. An empty collection still has a single, empty page.

use serde::{Deserialize, Serialize};

/// Number of entries per page unless configured otherwise
pub const DEFAULT_PER_PAGE: usize = 10;

/// Raw `?page=` query parameters as received
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// A requested page number, possibly out of range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest(i64);

impl PageRequest {
    pub fn first() -> Self {
        Self(1)
    }

    pub fn number(n: i64) -> Self {
        Self(n)
    }

    /// Interpret the raw query value; anything that is not an integer means page 1
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.trim().parse::<i64>().ok())
            .map(Self)
            .unwrap_or_else(Self::first)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        Self::parse(query.page.as_deref())
    }
}

/// The resolved slice of a collection to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub offset: usize,
    pub limit: usize,
}

/// One page of results with the metadata templates need for navigation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<usize>,
    pub previous_page_number: Option<usize>,
}

impl<T> Page<T> {
    /// Attach already-fetched items to a resolved window
    pub fn from_window(items: Vec<T>, window: PageWindow) -> Self {
        let has_next = window.number < window.num_pages;
        let has_previous = window.number > 1;
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            count: window.count,
            has_next,
            has_previous,
            next_page_number: has_next.then(|| window.number + 1),
            previous_page_number: has_previous.then(|| window.number - 1),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Splits collections into fixed-size pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

impl Paginator {
    /// A zero page size is treated as one entry per page
    pub fn new(per_page: usize) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn num_pages(&self, total: usize) -> usize {
        total.div_ceil(self.per_page).max(1)
    }

    /// Resolve a request against a collection of `total` entries
    pub fn window(&self, total: usize, request: PageRequest) -> PageWindow {
        let num_pages = self.num_pages(total);
        let number = match request.get() {
            n if n < 1 => 1,
            n if n as u64 > num_pages as u64 => num_pages,
            n => n as usize,
        };
        let offset = (number - 1) * self.per_page;
        PageWindow {
            number,
            num_pages,
            count: total,
            offset,
            limit: self.per_page.min(total.saturating_sub(offset)),
        }
    }

    /// Page through an in-memory sequence
    pub fn paginate<T>(&self, items: Vec<T>, request: PageRequest) -> Page<T> {
        let window = self.window(items.len(), request);
        let slice = items
            .into_iter()
            .skip(window.offset)
            .take(window.limit)
            .collect();
        Page::from_window(slice, window)
    }
}
