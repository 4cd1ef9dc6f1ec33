//! Pagination settings.

use crate::db::ConfigError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const MAX_PAGE_SIZE: usize = 10_000;
pub const MIN_PAGE_SIZE: usize = 100;
pub const MEMORY_THRESHOLD_MB: f64 = 100.0;
pub const WARNING_THRESHOLD_MB: f64 = 500.0;
pub const CHUNK_SIZE: usize = 10_000;
pub const MAX_MEMORY_USAGE_MB: f64 = 1000.0;
pub const PROGRESS_UPDATE_INTERVAL: usize = 1000;
/// Number of materialised pages a paginator keeps around.
pub const CACHE_SIZE_LIMIT: usize = 5;
/// Rows pulled to introspect a source's structure.
pub const SAMPLE_SIZE: usize = 100;

macro_rules! method_builder {
    ($field:ident, $ty:ty) => {
        pub fn $field(mut self, value: $ty) -> Self {
            self.$field = value;
            self
        }
    };
}

/// Knobs for page sizing, caching and progress reporting.
///
/// A config is handed to each paginator at construction and never shared
/// behind its back. Memory thresholds only steer the page size heuristics,
/// nothing enforces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub min_page_size: usize,
    /// Target footprint of a single page.
    pub memory_threshold_mb: f64,
    pub warning_threshold_mb: f64,
    /// Page size used for bulk reads through the chunk iterator.
    pub chunk_size: usize,
    pub max_memory_usage_mb: f64,
    /// Minimum number of rows between two progress reports of a bulk read.
    pub progress_update_interval: usize,
    pub cache_size_limit: usize,
    pub sample_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            min_page_size: MIN_PAGE_SIZE,
            memory_threshold_mb: MEMORY_THRESHOLD_MB,
            warning_threshold_mb: WARNING_THRESHOLD_MB,
            chunk_size: CHUNK_SIZE,
            max_memory_usage_mb: MAX_MEMORY_USAGE_MB,
            progress_update_interval: PROGRESS_UPDATE_INTERVAL,
            cache_size_limit: CACHE_SIZE_LIMIT,
            sample_size: SAMPLE_SIZE,
        }
    }
}

impl PaginationConfig {
    /// Checks the ordering between related fields.
    ///
    /// Page sizes must satisfy `min < default < max` and memory budgets
    /// `threshold < warning < max`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_page_size == 0 {
            return Err(ConfigError::Zero("min_page_size"));
        }

        if self.min_page_size >= self.default_page_size {
            return Err(ConfigError::MinPageSize {
                min: self.min_page_size,
                default: self.default_page_size,
            });
        }

        if self.default_page_size >= self.max_page_size {
            return Err(ConfigError::MaxPageSize {
                default: self.default_page_size,
                max: self.max_page_size,
            });
        }

        if self.memory_threshold_mb <= 0.0 {
            return Err(ConfigError::Zero("memory_threshold_mb"));
        }

        if self.memory_threshold_mb >= self.warning_threshold_mb {
            return Err(ConfigError::MemoryThreshold {
                threshold: self.memory_threshold_mb,
                warning: self.warning_threshold_mb,
            });
        }

        if self.warning_threshold_mb >= self.max_memory_usage_mb {
            return Err(ConfigError::WarningThreshold {
                warning: self.warning_threshold_mb,
                max: self.max_memory_usage_mb,
            });
        }

        [
            ("chunk_size", self.chunk_size),
            ("cache_size_limit", self.cache_size_limit),
            ("sample_size", self.sample_size),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0)
        .map_or(Ok(()), |(field, _)| Err(ConfigError::Zero(field)))
    }

    method_builder!(default_page_size, usize);
    method_builder!(max_page_size, usize);
    method_builder!(min_page_size, usize);
    method_builder!(memory_threshold_mb, f64);
    method_builder!(warning_threshold_mb, f64);
    method_builder!(chunk_size, usize);
    method_builder!(max_memory_usage_mb, f64);
    method_builder!(progress_update_interval, usize);
    method_builder!(cache_size_limit, usize);
    method_builder!(sample_size, usize);
}
