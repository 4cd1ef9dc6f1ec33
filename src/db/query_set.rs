use super::Value;
use std::fmt::{self, Display, Formatter};
use std::mem;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Materialised tabular result: column names plus rows of [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySet {
    pub columns: Vec<String>,
    pub tuples: Vec<Vec<Value>>,
}

impl QuerySet {
    pub fn new(columns: Vec<String>, tuples: Vec<Vec<Value>>) -> Self {
        Self { columns, tuples }
    }

    /// A result set with neither columns nor rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// First row, if any.
    pub fn fetch_one(&self) -> Option<&[Value]> {
        self.tuples.first().map(Vec::as_slice)
    }

    /// Value at `row` for the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|name| name == column)?;
        self.tuples.get(row)?.get(index)
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        self.slice(0, n)
    }

    /// Rows in `start..end`, clamped to the available rows.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        let start = start.min(end);

        Self::new(self.columns.clone(), self.tuples[start..end].to_vec())
    }

    /// Deep in-memory footprint in bytes: every cell plus the column names.
    pub fn memory_usage(&self) -> usize {
        let columns: usize = self
            .columns
            .iter()
            .map(|name| mem::size_of::<String>() + name.len())
            .sum();

        let cells: usize = self
            .tuples
            .iter()
            .map(|row| row.iter().map(Value::deep_size).sum::<usize>())
            .sum();

        columns + cells
    }

    pub fn memory_usage_mb(&self) -> f64 {
        self.memory_usage() as f64 / BYTES_PER_MB
    }
}

/// Renders the set as an ASCII table.
impl Display for QuerySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut width: Vec<usize> = self.columns.iter().map(|col| col.chars().count()).collect();

        let rows: Vec<Vec<String>> = self
            .tuples
            .iter()
            .map(|row| {
                row.iter()
                    .map(|value| value.to_string().replace('\n', "\\n"))
                    .collect()
            })
            .collect();

        rows.iter().for_each(|row| {
            row.iter().enumerate().for_each(|(idx, col)| {
                let len = col.chars().count();
                match width.get_mut(idx) {
                    Some(w) if len > *w => *w = len,
                    None => width.push(len),
                    _ => {}
                }
            })
        });

        width.iter_mut().for_each(|w| *w += 2);

        let mut border = String::from('+');
        width.iter().for_each(|w| {
            (0..*w).for_each(|_| border.push('-'));
            border.push('+');
        });

        let draw_row = |row: &[String]| -> String {
            let mut line = String::from('|');

            row.iter().enumerate().for_each(|(idx, col)| {
                line.push(' ');
                line.push_str(col);
                (0..width[idx] - col.chars().count() - 1).for_each(|_| line.push(' '));
                line.push('|');
            });

            line
        };

        writeln!(f, "{border}")?;
        writeln!(f, "{}", draw_row(self.columns.as_slice()))?;
        write!(f, "{border}")?;

        for row in &rows {
            write!(f, "\n{}", draw_row(row.as_slice()))?;
        }

        if !rows.is_empty() {
            write!(f, "\n{border}")?;
        }

        Ok(())
    }
}
