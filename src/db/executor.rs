use super::{DatabaseError, QuerySet, Value};
use crate::Result;
use rusqlite::types::ValueRef;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

/// The SQL execution capability paginators are built on.
///
/// A handle runs one statement and hands back the complete, materialised
/// result. Paginators only ever send it bounded queries (`COUNT(*)`,
/// `LIMIT`/`OFFSET`), so the result stays small.
pub trait Executor {
    fn execute(&self, sql: &str) -> Result<QuerySet>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, sql: &str) -> Result<QuerySet> {
        (**self).execute(sql)
    }
}

impl<E: Executor + ?Sized> Executor for Rc<E> {
    fn execute(&self, sql: &str) -> Result<QuerySet> {
        (**self).execute(sql)
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, sql: &str) -> Result<QuerySet> {
        (**self).execute(sql)
    }
}

/// Serialises access to a handle shared between threads.
impl<E: Executor> Executor for Mutex<E> {
    fn execute(&self, sql: &str) -> Result<QuerySet> {
        let handle = self
            .lock()
            .map_err(|_| DatabaseError::Other("executor lock poisoned".into()))?;

        handle.execute(sql)
    }
}

impl Executor for rusqlite::Connection {
    fn execute(&self, sql: &str) -> Result<QuerySet> {
        let mut statement = self.prepare(sql)?;
        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = statement.query([])?;
        let mut tuples = Vec::new();

        while let Some(row) = rows.next()? {
            let tuple = (0..columns.len())
                .map(|idx| row.get_ref(idx).map(Value::from))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            tuples.push(tuple);
        }

        Ok(QuerySet::new(columns, tuples))
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(integer) => Self::Integer(integer),
            ValueRef::Real(real) => Self::Real(real),
            ValueRef::Text(text) => Self::Text(String::from_utf8_lossy(text).into_owned()),
            ValueRef::Blob(blob) => Self::Blob(blob.to_vec()),
        }
    }
}
