use super::page::page_offset;
use super::{DataPaginator, Filter, PaginationConfig, Paginator};
use crate::db::{Executor, QuerySet};
use crate::Result;
use std::sync::Arc;
use tracing::warn;

/// Longest SQL prefix written to log lines.
const SQL_PREVIEW_LEN: usize = 120;

/// Pages through the result of a SQL query with `LIMIT`/`OFFSET`, never
/// holding more than a few pages of it.
///
/// The query text is fixed for the lifetime of the paginator. Filtering
/// builds a [new paginator](Self::filtered) around a derived query, so pages
/// cached for the old query can't leak into the new one.
pub struct QueryPaginator<E> {
    executor: E,
    /// User query without trailing semicolons.
    sql: String,
    /// Query `LIMIT`/`OFFSET` can be appended to.
    base_sql: String,
    base: DataPaginator,
}

impl<E: Executor> QueryPaginator<E> {
    /// Paginator with the default [`PaginationConfig`].
    pub fn new(executor: E, sql: &str) -> Self {
        Self::build(executor, sql, PaginationConfig::default())
    }

    pub fn with_config(executor: E, sql: &str, config: PaginationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(executor, sql, config))
    }

    fn build(executor: E, sql: &str, config: PaginationConfig) -> Self {
        let sql = strip_line_comments(sql)
            .trim()
            .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
            .to_string();

        Self {
            executor,
            base_sql: prepare_base_sql(&sql),
            sql,
            base: DataPaginator::new(config),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn base_sql(&self) -> &str {
        &self.base_sql
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Builds a paginator over the rows of this query that match `filter`.
    ///
    /// Returns [`None`] when the filter has no usable condition, e.g. an
    /// all-columns search while the sample came back without columns.
    pub fn filtered(&mut self, filter: &Filter) -> Option<Self>
    where
        E: Clone,
    {
        let sample_size = self.config().sample_size;
        let sample = self.get_sample_data(sample_size);

        let Some(sql) = filter.apply(&self.sql, &sample.columns) else {
            warn!(term = %filter.term, "filter produced no condition, not applying it");
            return None;
        };

        Some(Self::build(self.executor.clone(), &sql, self.config().clone()))
    }
}

/// Removes `--` comments outside of string literals and quoted identifiers,
/// so a trailing comment can't swallow the clauses appended to the query.
fn strip_line_comments(sql: &str) -> String {
    let mut stripped = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut quote = None;

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (None, '\'' | '"') => quote = Some(ch),
            (Some(opening), ch) if opening == ch => quote = None,
            (None, '-') if chars.peek() == Some(&'-') => {
                while chars.next_if(|next| *next != '\n').is_some() {}
                continue;
            }
            _ => {}
        }

        stripped.push(ch);
    }

    stripped
}

/// Plain `SELECT`s without ordering or limits take `LIMIT`/`OFFSET` as they
/// are. Anything else is wrapped in a subquery so its own clauses stay intact.
fn prepare_base_sql(sql: &str) -> String {
    let upper = sql.trim().to_uppercase();

    let plain = upper.starts_with("SELECT")
        && !upper.contains("ORDER BY")
        && !upper.contains("LIMIT")
        && !upper.contains("OFFSET");

    match plain {
        true => sql.to_string(),
        false => format!("SELECT * FROM ({sql}) AS paginated_query"),
    }
}

fn sql_preview(sql: &str) -> &str {
    match sql.char_indices().nth(SQL_PREVIEW_LEN) {
        Some((idx, _)) => &sql[..idx],
        None => sql,
    }
}

fn count_rows(result: &QuerySet) -> usize {
    result
        .fetch_one()
        .and_then(|row| row.first())
        .and_then(|value| value.as_integer())
        .and_then(|count| usize::try_from(count).ok())
        .unwrap_or(0)
}

impl<E: Executor> Paginator for QueryPaginator<E> {
    fn base(&self) -> &DataPaginator {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DataPaginator {
        &mut self.base
    }

    fn get_total_rows(&mut self) -> usize {
        let count_sql = format!(
            "SELECT COUNT(*) AS row_count FROM ({}) AS count_query",
            self.sql
        );
        let executor = &self.executor;

        self.base.total_rows_or(sql_preview(&self.sql), || {
            executor.execute(&count_sql).map(|result| count_rows(&result))
        })
    }

    fn get_sample_data(&mut self, sample_size: usize) -> Arc<QuerySet> {
        let sample_sql = format!("{} LIMIT {sample_size}", self.base_sql);
        let executor = &self.executor;

        self.base
            .sample_or(sql_preview(&self.sql), || executor.execute(&sample_sql))
    }

    fn fetch_page(&mut self, page_number: usize, page_size: usize) -> Result<QuerySet> {
        let offset = page_offset(page_number, page_size)?;
        let paginated_sql = format!("{} LIMIT {page_size} OFFSET {offset}", self.base_sql);

        self.executor.execute(&paginated_sql)
    }

    fn describe(&self) -> String {
        sql_preview(&self.sql).to_string()
    }
}
