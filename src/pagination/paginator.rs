use super::cache::PageCache;
use super::page::{page_offset, report};
use super::{sizing, Chunks, PageInfo, PaginationConfig, ProgressFn};
use crate::db::{DatabaseError, QuerySet};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// State every paginator shares, whatever the rows come from: the config,
/// the page cache and the memoised row count and sample.
#[derive(Debug)]
pub struct DataPaginator {
    config: PaginationConfig,
    cache: PageCache,
    total_rows: Option<usize>,
    sample: Option<Arc<QuerySet>>,
}

impl DataPaginator {
    /// Expects an already [validated](PaginationConfig::validate) config.
    pub fn new(config: PaginationConfig) -> Self {
        Self {
            cache: PageCache::with_max_size(config.cache_size_limit.max(1)),
            config,
            total_rows: None,
            sample: None,
        }
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// See [`sizing::estimate_row_size`].
    pub fn estimate_row_size(&self, sample: &QuerySet) -> usize {
        sizing::estimate_row_size(sample)
    }

    /// See [`sizing::optimal_page_size`].
    pub fn get_optimal_page_size(
        &self,
        estimated_row_size_bytes: usize,
        total_rows: usize,
    ) -> usize {
        sizing::optimal_page_size(&self.config, estimated_row_size_bytes, total_rows)
    }

    pub fn get_page_info(
        &self,
        page_number: usize,
        page_size: usize,
        total_rows: usize,
    ) -> PageInfo {
        PageInfo::new(page_number, page_size, total_rows)
    }

    /// Drops every cached page.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        debug!("page cache cleared");
    }

    /// Page numbers currently resident, oldest first.
    pub fn cached_pages(&self) -> Vec<usize> {
        self.cache.pages()
    }

    pub(crate) fn cached(&self, page_number: usize, page_size: usize) -> Option<Arc<QuerySet>> {
        self.cache.get(page_number, page_size)
    }

    pub(crate) fn manage_cache(
        &mut self,
        page_number: usize,
        page_size: usize,
        data: Arc<QuerySet>,
    ) {
        if let Some(evicted) = self.cache.insert(page_number, page_size, data) {
            debug!(evicted, page_number, "evicted cached page");
        }
    }

    /// Returns the memoised row count, running `count` the first time.
    /// A failed count is logged and memoised as zero.
    pub(crate) fn total_rows_or(
        &mut self,
        source: &str,
        count: impl FnOnce() -> Result<usize>,
    ) -> usize {
        if let Some(total_rows) = self.total_rows {
            return total_rows;
        }

        let total_rows = match count() {
            Ok(total_rows) => {
                info!(total_rows, source, "counted total rows");
                total_rows
            }
            Err(err) => {
                error!(source, %err, "failed to get row count");
                0
            }
        };

        self.total_rows = Some(total_rows);
        total_rows
    }

    /// Returns the memoised sample, running `fetch` the first time.
    /// A failed fetch is logged and memoised as an empty set.
    pub(crate) fn sample_or(
        &mut self,
        source: &str,
        fetch: impl FnOnce() -> Result<QuerySet>,
    ) -> Arc<QuerySet> {
        if let Some(sample) = &self.sample {
            return Arc::clone(sample);
        }

        let sample = match fetch() {
            Ok(sample) => {
                debug!(rows = sample.len(), source, "retrieved sample data");
                sample
            }
            Err(err) => {
                error!(source, %err, "failed to get sample data");
                QuerySet::empty()
            }
        };

        let sample = Arc::new(sample);
        self.sample = Some(Arc::clone(&sample));
        sample
    }
}

/// A stateful source of pages.
///
/// Implementors supply the row count, the sample and the raw page fetch;
/// caching, page metadata and bulk iteration come for free.
///
/// Row counts and samples never fail from the caller's point of view, they
/// degrade to zero rows. Page fetches do fail, since there is no page that
/// wouldn't lie about the data.
pub trait Paginator {
    fn base(&self) -> &DataPaginator;

    fn base_mut(&mut self) -> &mut DataPaginator;

    /// Total rows of the source. Computed once, `0` on failure.
    fn get_total_rows(&mut self) -> usize;

    /// The first `sample_size` rows. Computed once, empty on failure.
    fn get_sample_data(&mut self, sample_size: usize) -> Arc<QuerySet>;

    /// Reads rows `page_number * page_size ..` straight from the source,
    /// bypassing the cache.
    fn fetch_page(&mut self, page_number: usize, page_size: usize) -> Result<QuerySet>;

    /// Short description of the source for log lines.
    fn describe(&self) -> String;

    /// Progress message shown while [`Self::fetch_page`] runs.
    fn fetch_label(&self) -> &'static str {
        "Executing query..."
    }

    /// Progress message shown once rows are in memory.
    fn process_label(&self) -> &'static str {
        "Processing results..."
    }

    fn config(&self) -> &PaginationConfig {
        self.base().config()
    }

    fn estimate_row_size(&self, sample: &QuerySet) -> usize {
        self.base().estimate_row_size(sample)
    }

    fn get_optimal_page_size(&self, estimated_row_size_bytes: usize, total_rows: usize) -> usize {
        self.base().get_optimal_page_size(estimated_row_size_bytes, total_rows)
    }

    fn get_page_info(&self, page_number: usize, page_size: usize, total_rows: usize) -> PageInfo {
        self.base().get_page_info(page_number, page_size, total_rows)
    }

    fn clear_cache(&mut self) {
        self.base_mut().clear_cache();
    }

    /// Returns one page and its metadata, from the cache when possible.
    fn get_page(
        &mut self,
        page_number: usize,
        page_size: usize,
        mut progress: Option<ProgressFn<'_>>,
    ) -> Result<(Arc<QuerySet>, PageInfo)> {
        if page_size == 0 {
            return Err(DatabaseError::InvalidPageSize);
        }
        page_offset(page_number, page_size)?;

        if let Some(data) = self.base().cached(page_number, page_size) {
            debug!(page_number, "retrieved page from cache");
            let total_rows = self.get_total_rows();
            let info = self
                .get_page_info(page_number, page_size, total_rows)
                .with_memory_usage(data.memory_usage_mb());

            return Ok((data, info));
        }

        report(&mut progress, &format!("Loading page {}...", page_number.saturating_add(1)), 10);
        report(&mut progress, self.fetch_label(), 50);

        let started = Instant::now();
        let data = match self.fetch_page(page_number, page_size) {
            Ok(data) => Arc::new(data),
            Err(err) => {
                error!(page_number, source = %self.describe(), %err, "failed to load page");
                report(&mut progress, &format!("Error loading page: {err}"), 0);
                return Err(err);
            }
        };
        let load_time = started.elapsed();

        report(&mut progress, self.process_label(), 80);

        let total_rows = self.get_total_rows();
        let info = self
            .get_page_info(page_number, page_size, total_rows)
            .with_memory_usage(data.memory_usage_mb());

        if info.memory_usage_mb > self.config().warning_threshold_mb {
            warn!(
                page_number,
                memory_usage_mb = info.memory_usage_mb,
                warning_threshold_mb = self.config().warning_threshold_mb,
                "page exceeds memory warning threshold"
            );
        }

        self.base_mut().manage_cache(page_number, page_size, Arc::clone(&data));

        report(&mut progress, "Page loaded successfully", 100);
        info!(page_number, rows = data.len(), ?load_time, "loaded page");

        Ok((data, info))
    }

    /// Lazy, finite sequence over every page of `page_size` rows, in order.
    ///
    /// Calling it again starts over from the first chunk; pages still in the
    /// cache aren't fetched twice.
    fn get_page_iterator<'p>(
        &'p mut self,
        page_size: usize,
        progress: Option<ProgressFn<'p>>,
    ) -> Chunks<'p, Self>
    where
        Self: Sized,
    {
        Chunks::new(self, page_size, progress)
    }
}
