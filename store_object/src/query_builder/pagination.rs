//! Pagination
//!
//! Page arithmetic lives here so the helper only has to run the statements.

use serde::Serialize;

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageData<T> {
    /// Total matching rows; for pages fetched without a count this is the number of rows
    /// returned (see `total_counted`)
    pub total: i64,
    /// Effective page size after clamping to the configured maximum
    pub page_size: i64,
    pub data: Vec<T>,
    /// Whether `total` came from a count query
    pub total_counted: bool,
}

impl<T> PageData<T> {
    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Number of pages: 0 when there is nothing, `total` itself for a page size below 1
    pub fn total_page(&self) -> i64 {
        if self.total <= 0 {
            0
        } else if self.page_size < 1 {
            self.total
        } else {
            self.total / self.page_size + i64::from(self.total % self.page_size != 0)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageData<U> {
        PageData {
            total: self.total,
            page_size: self.page_size,
            data: self.data.into_iter().map(f).collect(),
            total_counted: self.total_counted,
        }
    }
}

/// LIMIT/OFFSET window for one page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub page_size: i64,
    pub limit: i64,
    pub offset: i64,
}

impl PageWindow {
    /// Pages are 1-based (anything below 1 reads page 1); the size is clamped to
    /// `max_page_size` and a negative size selects nothing
    pub fn new(page: i64, requested_size: i64, max_page_size: i64) -> Self {
        let page = page.max(1);
        let page_size = requested_size.min(max_page_size);
        let limit = page_size.max(0);
        let offset = (page - 1).saturating_mul(limit);
        Self {
            page,
            page_size,
            limit,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(total: i64, page_size: i64) -> PageData<()> {
        PageData {
            total,
            page_size,
            data: Vec::new(),
            total_counted: true,
        }
    }

    #[test]
    fn test_total_page() {
        assert_eq!(page(23, 5).total_page(), 5);
        assert_eq!(page(20, 5).total_page(), 4);
        assert_eq!(page(1, 5).total_page(), 1);
        assert_eq!(page(0, 5).total_page(), 0);
        assert_eq!(page(-3, 5).total_page(), 0);
        assert_eq!(page(23, 0).total_page(), 23);
        assert_eq!(page(23, -1).total_page(), 23);
    }

    #[test]
    fn test_window_clamps_to_max() {
        let window = PageWindow::new(1, 10, 5);
        assert_eq!((window.page_size, window.limit, window.offset), (5, 5, 0));

        let window = PageWindow::new(3, 10, i64::MAX);
        assert_eq!((window.limit, window.offset), (10, 20));
    }

    #[test]
    fn test_window_edge_cases() {
        assert_eq!(PageWindow::new(0, 10, 100).offset, 0);
        assert_eq!(PageWindow::new(-4, 10, 100).page, 1);

        let negative = PageWindow::new(2, -5, 100);
        assert_eq!((negative.limit, negative.offset), (0, 0));

        let huge = PageWindow::new(i64::MAX, i64::MAX, i64::MAX);
        assert_eq!(huge.offset, i64::MAX);
    }

    #[test]
    fn test_map_keeps_counts() {
        let mapped = PageData {
            total: 2,
            page_size: 10,
            data: vec![1, 2],
            total_counted: false,
        }
        .map(|n| n * 10);
        assert_eq!(mapped.data, vec![10, 20]);
        assert!(!mapped.total_counted);
    }
}
