//! Dataset-level text search, expressed as SQL.
//!
//! A [`Filter`] turns a search term into a `WHERE` clause over the original
//! query, so the whole result set is filtered by the engine rather than the
//! page on screen.

/// Substring search over one column or all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub term: String,
    /// Search this column only, every column when [`None`].
    pub column: Option<String>,
    pub case_sensitive: bool,
}

impl Filter {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            column: None,
            case_sensitive: false,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// `WHERE` condition for this filter. Empty when the term is blank, or
    /// when searching all columns and `columns` is empty.
    ///
    /// Every column is cast to text. Case insensitive searches match
    /// `LOWER(..) LIKE LOWER('%term%')`. Case sensitive ones use `instr`,
    /// since `LIKE` folds ASCII case on SQLite.
    pub fn condition(&self, columns: &[String]) -> String {
        let term = self.term.trim();
        if term.is_empty() {
            return String::new();
        }

        let escaped = term.replace('\'', "''");

        match &self.column {
            Some(column) => self.predicate(column, &escaped),
            None => columns
                .iter()
                .map(|column| self.predicate(column, &escaped))
                .collect::<Vec<_>>()
                .join(" OR "),
        }
    }

    /// Wraps `sql` so that only matching rows remain, [`None`] if there's
    /// no condition to apply.
    pub fn apply(&self, sql: &str, columns: &[String]) -> Option<String> {
        let condition = self.condition(columns);
        if condition.is_empty() {
            return None;
        }

        Some(format!(
            "SELECT * FROM ({sql}) AS filtered_data WHERE {condition}"
        ))
    }

    fn predicate(&self, column: &str, escaped: &str) -> String {
        let column = quote_identifier(column);

        match self.case_sensitive {
            true => format!("instr(CAST({column} AS TEXT), '{escaped}') > 0"),
            false => format!("LOWER(CAST({column} AS TEXT)) LIKE LOWER('%{escaped}%')"),
        }
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["name".into(), "city".into()]
    }

    #[test]
    fn test_single_column() {
        let filter = Filter::new("Smith").column("name");

        assert_eq!(
            filter.condition(&columns()),
            r#"LOWER(CAST("name" AS TEXT)) LIKE LOWER('%Smith%')"#
        );
    }

    #[test]
    fn test_all_columns_case_sensitive() {
        let filter = Filter::new("York").case_sensitive(true);

        assert_eq!(
            filter.condition(&columns()),
            r#"instr(CAST("name" AS TEXT), 'York') > 0 OR instr(CAST("city" AS TEXT), 'York') > 0"#
        );
    }

    #[test]
    fn test_quotes_are_escaped() {
        let filter = Filter::new("O'Brien").column(r#"last "name""#);

        assert_eq!(
            filter.condition(&[]),
            r#"LOWER(CAST("last ""name""" AS TEXT)) LIKE LOWER('%O''Brien%')"#
        );
    }

    #[test]
    fn test_degenerate_filters() {
        assert_eq!(Filter::new("x").condition(&[]), "");
        assert_eq!(Filter::new("   ").condition(&columns()), "");
        assert_eq!(Filter::new("x").apply("SELECT 1", &[]), None);
    }

    #[test]
    fn test_apply_wraps_query() {
        let sql = Filter::new("a").column("name").apply("SELECT * FROM t", &[]);
        let condition = r#"LOWER(CAST("name" AS TEXT)) LIKE LOWER('%a%')"#;

        assert_eq!(
            sql,
            Some(format!(
                "SELECT * FROM (SELECT * FROM t) AS filtered_data WHERE {condition}"
            ))
        );
    }
}
