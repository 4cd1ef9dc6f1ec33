//! Error taxonomy for data sources and pagination.

use std::io;

/// Everything that can go wrong while talking to a data source.
///
/// Only page fetches surface these to the caller. Row counting and sampling
/// log them and fall back to an empty result instead.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failure reported by the embedded SQLite engine.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failure reported by any other [`Executor`](super::Executor).
    #[error("sql error: {0}")]
    Sql(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),
    /// The file extension or the requested format isn't one we can page.
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
    /// A page of zero rows was requested.
    #[error("page size must be greater than zero")]
    InvalidPageSize,
    /// The first row of the page doesn't fit in a `usize`.
    #[error("page {page_number} of {page_size} rows is out of range")]
    PageOutOfRange { page_number: usize, page_size: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Other(String),
}

/// Relationships between [`PaginationConfig`](crate::pagination::PaginationConfig)
/// fields that don't hold.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("minimum page size ({min}) must be less than default page size ({default})")]
    MinPageSize { min: usize, default: usize },
    #[error("default page size ({default}) must be less than maximum page size ({max})")]
    MaxPageSize { default: usize, max: usize },
    #[error("memory threshold ({threshold} MB) must be less than warning threshold ({warning} MB)")]
    MemoryThreshold { threshold: f64, warning: f64 },
    #[error("warning threshold ({warning} MB) must be less than maximum memory usage ({max} MB)")]
    WarningThreshold { warning: f64, max: f64 },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl DatabaseError {
    /// Wraps an error message coming from a foreign SQL engine.
    pub fn sql(detail: impl Into<String>) -> Self {
        Self::Sql(detail.into())
    }
}
