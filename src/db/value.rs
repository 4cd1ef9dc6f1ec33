//! Runtime cell values.
//!
//! Every data source (SQL engines, CSV, Parquet, Excel) is flattened into the
//! same small set of variants so pages can be cached, measured and rendered
//! without caring where they came from.

use std::fmt::{self, Display, Formatter};
use std::mem;

/// A single cell of a result set.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Bytes owned by this value outside of its inline representation.
    pub fn heap_size(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Blob(blob) => blob.len(),
            _ => 0,
        }
    }

    /// Inline size plus [heap size](Self::heap_size).
    pub fn deep_size(&self) -> usize {
        mem::size_of::<Self>() + self.heap_size()
    }

    /// Infers the most specific value for a raw text cell, the way CSV
    /// readers usually do: empty is null, then integer, float, boolean and
    /// finally plain text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }

        if let Ok(integer) = trimmed.parse::<i64>() {
            return Self::Integer(integer);
        }

        if let Ok(real) = trimmed.parse::<f64>() {
            return Self::Real(real);
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "true" => Self::Boolean(true),
            "false" => Self::Boolean(false),
            _ => Self::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(integer) => Some(*integer),
            Self::Real(real) if real.fract() == 0.0 => Some(*real as i64),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Boolean(bool) => f.write_str(if *bool { "TRUE" } else { "FALSE" }),
            Self::Integer(integer) => write!(f, "{integer}"),
            Self::Real(real) => write!(f, "{real}"),
            Self::Text(text) => f.write_str(text),
            Self::Blob(blob) => {
                f.write_str("\\x")?;
                blob.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
