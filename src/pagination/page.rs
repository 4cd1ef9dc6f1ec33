use crate::db::{DatabaseError, QuerySet};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Position of one page inside a result set.
///
/// Built fresh for every page handed out and paired with that page's rows.
/// `page_size` is the requested size, so the last page may hold fewer rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Zero-based.
    pub page_number: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub total_pages: usize,
    pub start_row: usize,
    /// Exclusive: `min(start_row + page_size, total_rows)`.
    pub end_row: usize,
    pub has_next: bool,
    pub has_previous: bool,
    /// Footprint of the materialised page.
    pub memory_usage_mb: f64,
}

impl PageInfo {
    pub fn new(page_number: usize, page_size: usize, total_rows: usize) -> Self {
        let total_pages = match page_size {
            0 => 0,
            size => total_rows.div_ceil(size),
        };
        let start_row = page_number.saturating_mul(page_size);
        let end_row = start_row.saturating_add(page_size).min(total_rows);

        Self {
            page_number,
            page_size,
            total_rows,
            total_pages,
            start_row,
            end_row,
            has_next: page_number < total_pages.saturating_sub(1),
            has_previous: page_number > 0,
            memory_usage_mb: 0.0,
        }
    }

    pub fn with_memory_usage(mut self, memory_usage_mb: f64) -> Self {
        self.memory_usage_mb = memory_usage_mb;
        self
    }

    /// Rows this page covers.
    pub fn rows(&self) -> usize {
        self.end_row.saturating_sub(self.start_row)
    }

    pub fn last_page(&self) -> usize {
        self.total_pages.saturating_sub(1)
    }
}

/// A page enriched with its position in a bulk read.
#[derive(Debug, Clone)]
pub struct DataChunk {
    pub data: Arc<QuerySet>,
    pub chunk_number: usize,
    pub total_chunks: usize,
    pub start_row: usize,
    pub end_row: usize,
    pub memory_usage_mb: f64,
    pub load_time: Duration,
}

/// Index of the first row of a page.
pub(crate) fn page_offset(page_number: usize, page_size: usize) -> Result<usize> {
    page_number
        .checked_mul(page_size)
        .ok_or(DatabaseError::PageOutOfRange {
            page_number,
            page_size,
        })
}

/// Progress sink: a human readable stage and a percentage in `0..=100`.
pub type ProgressFn<'a> = &'a mut dyn FnMut(&str, u8);

pub(crate) fn report(progress: &mut Option<ProgressFn<'_>>, message: &str, percent: u8) {
    if let Some(callback) = progress {
        callback(message, percent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        for total_rows in [0usize, 1, 9, 10, 11, 23, 100, 1001] {
            for page_size in [1, 3, 10, 100] {
                let total_pages = total_rows.div_ceil(page_size);

                for page_number in 0..total_pages {
                    let info = PageInfo::new(page_number, page_size, total_rows);

                    assert_eq!(info.total_pages, total_pages);
                    assert_eq!(info.start_row, page_number * page_size);
                    assert_eq!(info.end_row, (info.start_row + page_size).min(total_rows));
                    assert!(info.end_row - info.start_row <= page_size);
                    assert_eq!(info.has_next, page_number < total_pages - 1);
                    assert_eq!(info.has_previous, page_number > 0);
                }
            }
        }
    }

    #[test]
    fn test_empty_result() {
        let info = PageInfo::new(0, 10, 0);

        assert_eq!(info.total_pages, 0);
        assert_eq!((info.start_row, info.end_row), (0, 0));
        assert!(!info.has_next);
        assert!(!info.has_previous);
        assert_eq!(info.rows(), 0);
    }

    #[test]
    fn test_zero_page_size_has_no_pages() {
        let info = PageInfo::new(0, 0, 50);

        assert_eq!(info.total_pages, 0);
        assert!(!info.has_next);
    }

    #[test]
    fn test_last_partial_page() {
        let info = PageInfo::new(2, 10, 23);

        assert_eq!(info.total_pages, 3);
        assert_eq!((info.start_row, info.end_row), (20, 23));
        assert_eq!(info.rows(), 3);
        assert!(!info.has_next);
        assert!(info.has_previous);
        assert_eq!(info.last_page(), 2);
    }

    #[test]
    fn test_huge_page_numbers() {
        let info = PageInfo::new(usize::MAX, 10, 23);

        assert!(!info.has_next);
        assert_eq!((info.start_row, info.end_row), (usize::MAX, 23));

        assert_eq!(page_offset(3, 10).ok(), Some(30));
        assert!(matches!(
            page_offset(usize::MAX / 2, 10),
            Err(DatabaseError::PageOutOfRange { page_size: 10, .. })
        ));
    }

    #[test]
    fn test_report_forwards_to_callback() {
        let mut seen = Vec::new();
        let mut callback = |message: &str, percent: u8| seen.push((message.to_string(), percent));
        let mut progress: Option<ProgressFn<'_>> = Some(&mut callback);

        report(&mut progress, "Loading page 1...", 10);
        report(&mut None, "ignored", 50);
        drop(progress);

        assert_eq!(seen, vec![("Loading page 1...".to_string(), 10)]);
    }
}
