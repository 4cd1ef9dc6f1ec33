//! Data source primitives.
//!
//! This module holds what every paginator speaks in: [`Value`]s grouped into a
//! [`QuerySet`], the [`Executor`] capability used to run SQL, and the error
//! types shared by every source.

mod error;
mod executor;
mod query_set;
mod value;

pub use error::{ConfigError, DatabaseError};
pub use executor::Executor;
pub use query_set::QuerySet;
pub use value::Value;
