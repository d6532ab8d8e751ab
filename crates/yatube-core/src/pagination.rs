//! Page-number pagination for post listings.
//!
//! Page numbers come straight from the `page` query parameter, so anything
//! that does not parse is treated as the first page and anything out of range
//! is clamped to the nearest existing page. Listings never fail because of
//! a bad page number.

use std::num::IntErrorKind;

use serde::Serialize;

/// Number of posts shown on one listing page.
pub const PAGE_SIZE: u64 = 10;

/// Parse a raw `page` query value.
///
/// Missing or non-numeric input yields `1`. Overflowing input saturates so
/// that it still clamps to the first or last page.
pub fn parse_page_number(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else {
        return 1;
    };

    match raw.trim().parse::<i64>() {
        Ok(number) => number,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            IntErrorKind::NegOverflow => i64::MIN,
            _ => 1,
        },
    }
}

/// Splits `total` ordered items into pages of `per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(total: u64, per_page: u64) -> Self {
        Self {
            total,
            per_page: per_page.max(1),
        }
    }

    /// Number of pages; an empty listing still has one (empty) page.
    pub fn num_pages(&self) -> u64 {
        self.total.div_ceil(self.per_page).max(1)
    }

    /// Resolve a raw page parameter to a concrete page window.
    pub fn window(&self, requested: Option<&str>) -> PageWindow {
        self.window_for(parse_page_number(requested))
    }

    /// Clamp `number` into `[1, num_pages]`.
    pub fn window_for(&self, number: i64) -> PageWindow {
        let num_pages = self.num_pages();
        let number = u64::try_from(number).unwrap_or(1).clamp(1, num_pages);

        PageWindow {
            number,
            num_pages,
            total: self.total,
            per_page: self.per_page,
        }
    }
}

/// A resolved page: which slice of the listing to fetch and how to navigate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    number: u64,
    num_pages: u64,
    total: u64,
    per_page: u64,
}

impl PageWindow {
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn num_pages(&self) -> u64 {
        self.num_pages
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Index of the first item on this page.
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    /// Maximum number of items on this page. The last page may hold fewer.
    pub fn limit(&self) -> u64 {
        self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    /// Attach the items fetched for this window.
    pub fn fill<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
            has_next: self.has_next(),
            has_previous: self.has_previous(),
            next_page_number: self.next_page_number(),
            previous_page_number: self.previous_page_number(),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
        }
    }
}

/// Slice an already ordered, in-memory sequence into [`PAGE_SIZE`] pages.
pub fn paginate<T>(items: Vec<T>, requested: Option<&str>) -> Page<T> {
    let window = Paginator::new(items.len() as u64, PAGE_SIZE).window(requested);
    let offset = usize::try_from(window.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(window.limit()).unwrap_or(usize::MAX);

    let slice = items.into_iter().skip(offset).take(limit).collect();
    window.fill(slice)
}
