//! Pagination implementation.
//!
//! This module presents arbitrarily large results one page at a time. A
//! [`Paginator`] wraps a source (a SQL query through an
//! [`Executor`](crate::db::Executor), or a tabular file), memoises its row
//! count and a small sample, and keeps a few pages in a distance-based cache.
//! [`PageBrowser`] is the navigation state a user interface drives.

mod browser;
mod cache;
mod chunks;
pub mod config;
mod file;
mod filter;
mod page;
mod paginator;
mod query;
pub mod sizing;

pub use browser::PageBrowser;
pub use chunks::Chunks;
pub use config::PaginationConfig;
pub use file::{FileFormat, FilePaginator};
pub use filter::Filter;
pub use page::{DataChunk, PageInfo, ProgressFn};
pub use paginator::{DataPaginator, Paginator};
pub use query::QueryPaginator;
