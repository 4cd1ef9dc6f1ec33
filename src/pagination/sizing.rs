//! Page size heuristics.
//!
//! A page should weigh roughly `memory_threshold_mb` no matter how wide its
//! rows are: wide rows give fewer rows per page, narrow rows give more.

use super::PaginationConfig;
use crate::db::QuerySet;
use tracing::{debug, info};

/// Assumed row size when there's no sample to measure.
pub const DEFAULT_ROW_SIZE: usize = 1024;
/// Floor for measured row sizes.
pub const MIN_ROW_SIZE: usize = 64;

/// Average deep footprint of one row of `sample`, in bytes.
pub fn estimate_row_size(sample: &QuerySet) -> usize {
    if sample.is_empty() {
        return DEFAULT_ROW_SIZE;
    }

    let row_size = sample.memory_usage() / sample.len();
    debug!(row_size, "estimated row size");

    row_size.max(MIN_ROW_SIZE)
}

/// Rows per page that keep one page near the memory threshold, clamped to
/// the configured bounds and shrunk for result sets smaller than that.
pub fn optimal_page_size(
    config: &PaginationConfig,
    estimated_row_size_bytes: usize,
    total_rows: usize,
) -> usize {
    let target_memory_bytes = (config.memory_threshold_mb * 1024.0 * 1024.0) as usize;
    let by_memory = target_memory_bytes / estimated_row_size_bytes.max(1);

    let mut optimal = config.min_page_size.max(config.max_page_size.min(by_memory));

    if total_rows < optimal {
        optimal = config.default_page_size.min(total_rows);
    }

    info!(optimal, total_rows, "calculated optimal page size");
    optimal
}
