use super::page::page_offset;
use super::{DataPaginator, PaginationConfig, Paginator};
use crate::db::{DatabaseError, QuerySet, Value};
use crate::Result;
use calamine::{Data, Reader};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Tabular file formats a [`FilePaginator`] understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Parquet,
    Excel,
}

impl FileFormat {
    /// Guesses the format from the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        extension.parse()
    }
}

impl FromStr for FileFormat {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" | "pq" => Ok(Self::Parquet),
            "xlsx" | "xls" | "xlsm" => Ok(Self::Excel),
            other => Err(DatabaseError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Where a [`FilePaginator`] reads from and how.
#[derive(Debug, Clone)]
struct Source {
    path: PathBuf,
    format: FileFormat,
    delimiter: u8,
}

impl Source {
    /// Number of lines in the file, counting a last line without newline.
    fn count_lines(&self) -> Result<usize> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut lines = 0;
        let mut last = None;

        loop {
            let buffer = reader.fill_buf()?;
            if buffer.is_empty() {
                break;
            }

            lines += buffer.iter().filter(|byte| **byte == b'\n').count();
            last = buffer.last().copied();

            let len = buffer.len();
            reader.consume(len);
        }

        if last.is_some_and(|byte| byte != b'\n') {
            lines += 1;
        }

        Ok(lines)
    }

    fn count_rows(&self) -> Result<usize> {
        match self.format {
            FileFormat::Csv => self.count_lines().map(|lines| lines.saturating_sub(1)),
            FileFormat::Parquet => {
                let rows = self.parquet_reader()?.metadata().file_metadata().num_rows();
                usize::try_from(rows)
                    .map_err(|_| DatabaseError::Other(format!("invalid row count {rows}")))
            }
            FileFormat::Excel => self.read_all().map(|data| data.len()),
        }
    }

    /// Rows `skip..skip + limit` of the file.
    fn read(&self, skip: usize, limit: usize) -> Result<QuerySet> {
        match self.format {
            FileFormat::Csv => self.read_csv(skip, limit),
            FileFormat::Parquet => self.read_parquet(skip, limit),
            FileFormat::Excel => self
                .read_excel()
                .map(|data| data.slice(skip, skip.saturating_add(limit))),
        }
    }

    fn read_all(&self) -> Result<QuerySet> {
        self.read(0, usize::MAX)
    }

    fn read_csv(&self, skip: usize, limit: usize) -> Result<QuerySet> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(&self.path)?;

        let columns: Vec<String> = reader.headers()?.iter().map(String::from).collect();

        // skipped records are scanned but never turned into values
        let mut skipped = csv::ByteRecord::new();
        for _ in 0..skip {
            if !reader.read_byte_record(&mut skipped)? {
                return Ok(QuerySet::new(columns, Vec::new()));
            }
        }

        let mut record = csv::StringRecord::new();
        let mut tuples = Vec::new();

        while tuples.len() < limit && reader.read_record(&mut record)? {
            let mut tuple: Vec<Value> = record.iter().map(Value::infer).collect();
            tuple.resize(columns.len(), Value::Null);
            tuples.push(tuple);
        }

        Ok(QuerySet::new(columns, tuples))
    }

    fn parquet_reader(&self) -> Result<SerializedFileReader<File>> {
        Ok(SerializedFileReader::new(File::open(&self.path)?)?)
    }

    fn read_parquet(&self, skip: usize, limit: usize) -> Result<QuerySet> {
        let reader = self.parquet_reader()?;
        let metadata = reader.metadata();

        let columns = metadata
            .file_metadata()
            .schema()
            .get_fields()
            .iter()
            .map(|field| field.name().to_string())
            .collect();

        let mut skip = skip;
        let mut tuples = Vec::new();

        for idx in 0..metadata.num_row_groups() {
            if tuples.len() >= limit {
                break;
            }

            let group_rows = usize::try_from(metadata.row_group(idx).num_rows()).unwrap_or(0);
            if skip >= group_rows {
                skip -= group_rows;
                continue;
            }

            let group = reader.get_row_group(idx)?;
            for row in group
                .get_row_iter(None)?
                .skip(skip)
                .take(limit - tuples.len())
            {
                tuples.push(row_values(&row?));
            }

            skip = 0;
        }

        Ok(QuerySet::new(columns, tuples))
    }

    fn read_excel(&self) -> Result<QuerySet> {
        let mut workbook = calamine::open_workbook_auto(&self.path)?;
        let range = workbook.worksheet_range_at(0).ok_or_else(|| {
            DatabaseError::Other(format!("{} has no worksheets", self.path.display()))
        })??;

        let mut rows = range.rows();
        let columns = rows
            .next()
            .map(|header| header.iter().map(ToString::to_string).collect())
            .unwrap_or_default();

        let tuples = rows
            .map(|row| row.iter().map(cell_value).collect())
            .collect();

        Ok(QuerySet::new(columns, tuples))
    }
}

/// Pages through a tabular file.
///
/// - **CSV**: rows are counted by scanning for newlines (minus the header)
///   and pages are read by skipping records.
/// - **Parquet**: the row count comes from the footer and pages are streamed
///   row group by row group, skipping whole groups before the page.
/// - **Excel**: the first worksheet is read in full and sliced for every
///   count, sample and page. Large workbooks are slow, there's no cheaper way
///   to get at their rows.
pub struct FilePaginator {
    source: Source,
    base: DataPaginator,
}

impl FilePaginator {
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self::build(path.into(), format, PaginationConfig::default())
    }

    /// Paginator whose format is taken from the file extension.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = FileFormat::from_path(&path)?;

        Ok(Self::new(path, format))
    }

    pub fn with_config(
        path: impl Into<PathBuf>,
        format: FileFormat,
        config: PaginationConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(path.into(), format, config))
    }

    fn build(path: PathBuf, format: FileFormat, config: PaginationConfig) -> Self {
        Self {
            source: Source {
                path,
                format,
                delimiter: b',',
            },
            base: DataPaginator::new(config),
        }
    }

    /// Field delimiter for CSV files.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.source.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.source.path
    }

    pub fn format(&self) -> FileFormat {
        self.source.format
    }
}

fn row_values(row: &Row) -> Vec<Value> {
    row.get_column_iter()
        .map(|(_, field)| field_value(field))
        .collect()
}

fn field_value(field: &Field) -> Value {
    match field {
        Field::Null => Value::Null,
        Field::Bool(bool) => Value::Boolean(*bool),
        Field::Byte(int) => Value::Integer(i64::from(*int)),
        Field::Short(int) => Value::Integer(i64::from(*int)),
        Field::Int(int) => Value::Integer(i64::from(*int)),
        Field::Long(int) => Value::Integer(*int),
        Field::UByte(int) => Value::Integer(i64::from(*int)),
        Field::UShort(int) => Value::Integer(i64::from(*int)),
        Field::UInt(int) => Value::Integer(i64::from(*int)),
        Field::ULong(int) => i64::try_from(*int).map_or(Value::Real(*int as f64), Value::Integer),
        Field::Float(float) => Value::Real(f64::from(*float)),
        Field::Double(float) => Value::Real(*float),
        Field::Str(string) => Value::Text(string.clone()),
        Field::Bytes(bytes) => Value::Blob(bytes.data().to_vec()),
        other => Value::Text(other.to_string()),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(int) => Value::Integer(*int),
        Data::Float(float) => Value::Real(*float),
        Data::Bool(bool) => Value::Boolean(*bool),
        Data::String(string) => Value::Text(string.clone()),
        other => Value::Text(other.to_string()),
    }
}

impl Paginator for FilePaginator {
    fn base(&self) -> &DataPaginator {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DataPaginator {
        &mut self.base
    }

    fn get_total_rows(&mut self) -> usize {
        let source = &self.source;
        let path = source.path.display().to_string();

        self.base.total_rows_or(&path, || source.count_rows())
    }

    fn get_sample_data(&mut self, sample_size: usize) -> Arc<QuerySet> {
        let source = &self.source;
        let path = source.path.display().to_string();

        self.base.sample_or(&path, || source.read(0, sample_size))
    }

    fn fetch_page(&mut self, page_number: usize, page_size: usize) -> Result<QuerySet> {
        self.source.read(page_offset(page_number, page_size)?, page_size)
    }

    fn describe(&self) -> String {
        self.source.path.display().to_string()
    }

    fn fetch_label(&self) -> &'static str {
        "Reading file..."
    }

    fn process_label(&self) -> &'static str {
        "Processing data..."
    }
}
