use super::{Chunks, Filter, PageInfo, Paginator, ProgressFn, QueryPaginator};
use crate::db::{DatabaseError, Executor, QuerySet};
use crate::Result;
use std::mem;
use std::sync::Arc;
use tracing::{error, info};

/// Navigation state on top of a [`Paginator`]: the page on display, the
/// page size and, for queries, the filter in effect.
///
/// Applying a filter swaps in a new paginator and keeps the unfiltered one
/// aside, so clearing the filter is only a swap back.
pub struct PageBrowser<P> {
    active: P,
    /// Unfiltered paginator while a filter is applied.
    original: Option<P>,
    filter: Option<Filter>,
    page_size: usize,
    current_page: usize,
    current: Option<(Arc<QuerySet>, PageInfo)>,
}

impl<P: Paginator> PageBrowser<P> {
    pub fn new(paginator: P) -> Self {
        Self {
            page_size: paginator.config().default_page_size,
            active: paginator,
            original: None,
            filter: None,
            current_page: 0,
            current: None,
        }
    }

    /// The paginator pages are currently read from.
    pub fn paginator(&mut self) -> &mut P {
        &mut self.active
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_info(&self) -> Option<&PageInfo> {
        self.current.as_ref().map(|(_, info)| info)
    }

    pub fn data(&self) -> Option<&Arc<QuerySet>> {
        self.current.as_ref().map(|(data, _)| data)
    }

    /// Picks a page size from a sample of the source and loads page zero.
    pub fn load_initial_page(&mut self) -> Result<PageInfo> {
        let sample_size = self.active.config().sample_size;
        let sample = self.active.get_sample_data(sample_size);

        if !sample.is_empty() {
            let total_rows = self.active.get_total_rows();
            let row_size = self.active.estimate_row_size(&sample);
            let optimal = self.active.get_optimal_page_size(row_size, total_rows);

            if optimal > 0 {
                self.page_size = optimal;
            }
        }

        self.load_page(0)
    }

    pub fn load_page(&mut self, page_number: usize) -> Result<PageInfo> {
        self.load_page_with(page_number, None)
    }

    /// Same as [`Self::load_page`], reporting progress to `progress`.
    ///
    /// Pages past the end show the last page instead.
    pub fn load_page_with(
        &mut self,
        page_number: usize,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<PageInfo> {
        let page_number = page_number.min(self.last_page());
        let (data, info) = self
            .active
            .get_page(page_number, self.page_size, progress)
            .inspect_err(|err| error!(page_number, %err, "page navigation failed"))?;

        self.current_page = page_number;
        self.current = Some((data, info));

        Ok(info)
    }

    pub fn first(&mut self) -> Result<PageInfo> {
        self.load_page(0)
    }

    /// Moves one page back, [`None`] when already on the first page.
    pub fn previous(&mut self) -> Result<Option<PageInfo>> {
        match self.current_page {
            0 => Ok(None),
            page => self.load_page(page - 1).map(Some),
        }
    }

    /// Moves one page forward, [`None`] when already on the last page.
    pub fn next(&mut self) -> Result<Option<PageInfo>> {
        let has_next = self.page_info().is_some_and(|info| info.has_next);
        if !has_next {
            return Ok(None);
        }

        self.load_page(self.current_page + 1).map(Some)
    }

    pub fn last(&mut self) -> Result<PageInfo> {
        let last = self.last_page();
        self.load_page(last)
    }

    /// Zero-based index of the last page at the current page size, `0` when
    /// the source is empty.
    pub fn last_page(&mut self) -> usize {
        let total_rows = self.active.get_total_rows();
        PageInfo::new(0, self.page_size, total_rows).last_page()
    }

    /// Changes the page size, staying on the page that holds the first row
    /// currently displayed.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<PageInfo> {
        if page_size == 0 {
            return Err(DatabaseError::InvalidPageSize);
        }

        let current_row = self.page_info().map_or(0, |info| info.start_row);
        if page_size != self.page_size {
            self.page_size = page_size;
            self.active.clear_cache();
        }

        self.load_page(current_row / page_size)
    }

    /// Reads the whole source in chunks of the configured `chunk_size`.
    pub fn export_chunks<'b>(&'b mut self, progress: Option<ProgressFn<'b>>) -> Chunks<'b, P> {
        let chunk_size = self.active.config().chunk_size;
        self.active.get_page_iterator(chunk_size, progress)
    }

    /// One line summary of the page on display.
    pub fn status_line(&self) -> String {
        let Some(info) = self.page_info() else {
            return "No page loaded".to_string();
        };

        if info.total_rows == 0 {
            return "No rows".to_string();
        }

        let status = format!(
            "Page {} of {} ({}-{} of {} rows)",
            group_thousands(info.page_number + 1),
            group_thousands(info.total_pages),
            group_thousands(info.start_row + 1),
            group_thousands(info.end_row),
            group_thousands(info.total_rows),
        );

        match &self.filter {
            Some(filter) => format!("{status}, filtered by '{}'", filter.term),
            None => status,
        }
    }
}

impl<E: Executor + Clone> PageBrowser<QueryPaginator<E>> {
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    /// Replaces the active paginator with one over the rows of the original
    /// query that match `filter`, and shows its first page.
    ///
    /// Returns `false` without touching anything when the filter has no
    /// usable condition.
    pub fn apply_filter(&mut self, filter: Filter) -> Result<bool> {
        let source = self.original.as_mut().unwrap_or(&mut self.active);

        let Some(filtered) = source.filtered(&filter) else {
            return Ok(false);
        };

        info!(term = %filter.term, column = ?filter.column, "applying filter");

        let previous = mem::replace(&mut self.active, filtered);
        if self.original.is_none() {
            self.original = Some(previous);
        }

        self.filter = Some(filter);
        self.reset_display();
        self.load_page(0)?;

        Ok(true)
    }

    /// Restores the unfiltered paginator and shows its first page.
    ///
    /// Returns `false` when no filter was applied.
    pub fn clear_filter(&mut self) -> Result<bool> {
        let Some(original) = self.original.take() else {
            return Ok(false);
        };

        info!("clearing filter");

        self.active = original;
        self.active.clear_cache();
        self.filter = None;
        self.reset_display();
        self.load_page(0)?;

        Ok(true)
    }

    /// Row count of the query before any filter.
    pub fn unfiltered_total_rows(&mut self) -> usize {
        self.original
            .as_mut()
            .unwrap_or(&mut self.active)
            .get_total_rows()
    }
}

impl<P> PageBrowser<P> {
    fn reset_display(&mut self) {
        self.current_page = 0;
        self.current = None;
    }
}

/// `1234567` becomes `1,234,567`.
fn group_thousands(number: usize) -> String {
    let digits = number.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (idx, digit) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    grouped
}
