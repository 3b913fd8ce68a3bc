//! 1-based offset pagination shared by repositories and handlers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PaginationConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page must be >= 1 (got {0})")]
    InvalidPage(i64),

    #[error("page_size must be between 1 and {max} (got {got})")]
    InvalidPageSize { got: i64, max: u64 },

    #[error("page {0} is out of range")]
    PageOutOfRange(i64),
}

/// Raw `?page=&page_size=` query parameters before bounds checking.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

impl PageRequest {
    /// Validates the query against the configured bounds, filling defaults.
    pub fn from_query(
        query: PageQuery,
        config: &PaginationConfig,
    ) -> Result<Self, PaginationError> {
        let page = query.page.unwrap_or(1);
        let page = u64::try_from(page)
            .ok()
            .filter(|p| *p >= 1)
            .ok_or(PaginationError::InvalidPage(page))?;

        let max = config.max_page_size;
        let page_size = query
            .page_size
            .unwrap_or_else(|| i64::try_from(config.default_page_size).unwrap_or(i64::MAX));
        let page_size = u64::try_from(page_size)
            .ok()
            .filter(|s| (1..=max).contains(s))
            .ok_or(PaginationError::InvalidPageSize {
                got: page_size,
                max,
            })?;

        // The offset is bound as a signed 64-bit SQL integer.
        let offset_fits = (page - 1)
            .checked_mul(page_size)
            .is_some_and(|offset| i64::try_from(offset).is_ok());
        if !offset_fits {
            return Err(PaginationError::PageOutOfRange(query.page.unwrap_or(1)));
        }

        Ok(Self { page, page_size })
    }

    /// Unchecked constructor for internal callers; zero values are bumped to 1.
    #[must_use]
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub const fn page(&self) -> u64 {
        self.page
    }

    #[must_use]
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
            total_pages: total_pages(total, request.page_size),
        }
    }

    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

/// Ceiling division of `total` by `page_size`; zero when there is nothing to show.
#[must_use]
pub const fn total_pages(total: u64, page_size: u64) -> u64 {
    if total == 0 || page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}
