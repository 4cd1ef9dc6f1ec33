use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use folio::db::{DatabaseError, Value};
use folio::pagination::{FileFormat, FilePaginator, PageBrowser, Paginator};
use folio::Result;
use parquet::data_type::{ByteArray, ByteArrayType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

struct State {
    dir: TempDir,
}

impl State {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// `id,name,score` file with `rows` data rows.
    fn csv(&self, name: &str, rows: usize) -> PathBuf {
        let mut content = String::from("id,name,score\n");
        for id in 0..rows {
            content.push_str(&format!("{id},name {id},{}.5\n", id * 2));
        }

        let path = self.path(name);
        fs::write(&path, content).expect("Failed to write csv");
        path
    }

    /// Workbook whose first sheet holds `id,name,score` and `rows` data rows,
    /// with no score on row 3. A second sheet holds something else.
    fn excel(&self, name: &str, rows: u32) -> PathBuf {
        let path = self.path(name);
        let mut workbook = Workbook::new();

        let people = workbook.add_worksheet();
        for (col, header) in ["id", "name", "score"].into_iter().enumerate() {
            people
                .write_string(0, col as u16, header)
                .expect("Failed to write header");
        }
        for id in 0..rows {
            let row = id + 1;
            people.write_number(row, 0, id).expect("Failed to write id");
            people
                .write_string(row, 1, format!("name {id}"))
                .expect("Failed to write name");
            if id != 3 {
                people
                    .write_number(row, 2, f64::from(id * 2) + 0.5)
                    .expect("Failed to write score");
            }
        }

        workbook
            .add_worksheet()
            .write_string(0, 0, "not this one")
            .expect("Failed to write second sheet");

        workbook.save(&path).expect("Failed to save workbook");
        path
    }

    /// `id,name` parquet file, one row group per entry of `groups`.
    fn parquet(&self, name: &str, groups: &[usize]) -> Result<PathBuf> {
        let path = self.path(name);
        let schema = Arc::new(parse_message_type(
            "message rows { REQUIRED INT64 id; REQUIRED BINARY name (UTF8); }",
        )?);
        let props = Arc::new(WriterProperties::builder().build());
        let mut writer = SerializedFileWriter::new(File::create(&path)?, schema, props)?;

        let mut next_id = 0;
        for rows in groups {
            let ids: Vec<i64> = (next_id..next_id + *rows as i64).collect();
            let names: Vec<ByteArray> = ids
                .iter()
                .map(|id| ByteArray::from(format!("name {id}").as_str()))
                .collect();
            next_id += *rows as i64;

            let mut row_group = writer.next_row_group()?;
            if let Some(mut column) = row_group.next_column()? {
                column.typed::<Int64Type>().write_batch(&ids, None, None)?;
                column.close()?;
            }
            if let Some(mut column) = row_group.next_column()? {
                column.typed::<ByteArrayType>().write_batch(&names, None, None)?;
                column.close()?;
            }
            row_group.close()?;
        }

        writer.close()?;
        Ok(path)
    }
}

fn ids(paginator: &mut impl Paginator, page_number: usize, page_size: usize) -> Result<Vec<i64>> {
    let (data, _) = paginator.get_page(page_number, page_size, None)?;

    Ok(data
        .tuples
        .iter()
        .filter_map(|tuple| tuple[0].as_integer())
        .collect())
}

#[test]
fn csv_pages() -> Result<()> {
    let state = State::new();
    let mut paginator = FilePaginator::open(state.csv("people.csv", 23))?;

    assert_eq!(paginator.format(), FileFormat::Csv);
    assert_eq!(paginator.get_total_rows(), 23);

    let (page, info) = paginator.get_page(1, 10, None)?;
    assert_eq!(page.columns, vec!["id", "name", "score"]);
    assert_eq!(
        page.tuples[0],
        vec![Value::Integer(10), Value::from("name 10"), Value::Real(20.5)]
    );
    assert_eq!((info.start_row, info.end_row, info.total_pages), (10, 20, 3));

    assert_eq!(ids(&mut paginator, 2, 10)?, vec![20, 21, 22]);
    assert!(ids(&mut paginator, 7, 10)?.is_empty());

    Ok(())
}

#[test]
fn csv_without_trailing_newline() -> Result<()> {
    let state = State::new();
    let path = state.path("short.csv");
    fs::write(&path, "a,b\n1,2\n3,4")?;

    let mut paginator = FilePaginator::new(&path, FileFormat::Csv);

    assert_eq!(paginator.get_total_rows(), 2);
    assert_eq!(ids(&mut paginator, 0, 10)?, vec![1, 3]);

    Ok(())
}

#[test]
fn csv_with_custom_delimiter_and_ragged_rows() -> Result<()> {
    let state = State::new();
    let path = state.path("ragged.csv");
    fs::write(&path, "a;b;c\n1;x\n2;y;z\n")?;

    let mut paginator = FilePaginator::new(&path, FileFormat::Csv).delimiter(b';');
    let (page, _) = paginator.get_page(0, 10, None)?;

    assert_eq!(
        page.tuples,
        vec![
            vec![Value::Integer(1), Value::from("x"), Value::Null],
            vec![Value::Integer(2), Value::from("y"), Value::from("z")],
        ]
    );

    Ok(())
}

#[test]
fn csv_sample_and_chunks() -> Result<()> {
    let state = State::new();
    let mut paginator = FilePaginator::open(state.csv("big.csv", 250))?;

    let sample = paginator.get_sample_data(100);
    assert_eq!(sample.len(), 100);

    let chunks = paginator
        .get_page_iterator(100, None)
        .collect::<Result<Vec<_>>>()?;
    let rows: usize = chunks.iter().map(|chunk| chunk.data.len()).sum();

    assert_eq!(chunks.len(), 3);
    assert_eq!(rows, 250);
    assert_eq!(chunks[2].start_row, 200);

    Ok(())
}

#[test]
fn file_progress_labels() -> Result<()> {
    let state = State::new();
    let mut paginator = FilePaginator::open(state.csv("labels.csv", 3))?;
    let mut messages = Vec::new();
    let mut progress = |message: &str, _: u8| messages.push(message.to_string());

    paginator.get_page(0, 10, Some(&mut progress))?;

    assert_eq!(
        messages,
        vec![
            "Loading page 1...",
            "Reading file...",
            "Processing data...",
            "Page loaded successfully"
        ]
    );

    Ok(())
}

#[test]
fn parquet_pages_across_row_groups() -> Result<()> {
    let state = State::new();
    let path = state.parquet("rows.parquet", &[4, 4, 3])?;
    let mut paginator = FilePaginator::open(&path)?;

    assert_eq!(paginator.format(), FileFormat::Parquet);
    assert_eq!(paginator.get_total_rows(), 11);

    let (page, info) = paginator.get_page(1, 3, None)?;
    assert_eq!(page.columns, vec!["id", "name"]);
    assert_eq!(
        page.tuples,
        vec![
            vec![Value::Integer(3), Value::from("name 3")],
            vec![Value::Integer(4), Value::from("name 4")],
            vec![Value::Integer(5), Value::from("name 5")],
        ]
    );
    assert_eq!(info.total_pages, 4);

    assert_eq!(ids(&mut paginator, 3, 3)?, vec![9, 10]);
    assert!(ids(&mut paginator, 4, 3)?.is_empty());

    Ok(())
}

#[test]
fn excel_pages_from_the_first_sheet() -> Result<()> {
    let state = State::new();
    let mut paginator = FilePaginator::open(state.excel("book.xlsx", 7))?;

    assert_eq!(paginator.format(), FileFormat::Excel);
    assert_eq!(paginator.get_total_rows(), 7);

    let (page, info) = paginator.get_page(1, 3, None)?;
    assert_eq!(page.columns, vec!["id", "name", "score"]);
    assert_eq!(
        page.tuples,
        vec![
            vec![Value::Real(3.0), Value::from("name 3"), Value::Null],
            vec![Value::Real(4.0), Value::from("name 4"), Value::Real(8.5)],
            vec![Value::Real(5.0), Value::from("name 5"), Value::Real(10.5)],
        ]
    );
    assert_eq!((info.start_row, info.end_row, info.total_pages), (3, 6, 3));

    let (last, _) = paginator.get_page(2, 3, None)?;
    assert_eq!(last.tuples[0][1], Value::from("name 6"));
    assert_eq!(last.len(), 1);
    assert!(paginator.get_page(3, 3, None)?.0.is_empty());

    assert_eq!(paginator.get_sample_data(2).len(), 2);

    Ok(())
}

#[test]
fn missing_file() {
    let mut paginator = FilePaginator::new(Path::new("/nonexistent/data.csv"), FileFormat::Csv);

    assert_eq!(paginator.get_total_rows(), 0);
    assert!(paginator.get_sample_data(10).is_empty());
    assert!(matches!(
        paginator.get_page(0, 10, None),
        Err(DatabaseError::Csv(_) | DatabaseError::Io(_))
    ));
}

#[test]
fn unsupported_format() {
    assert!(matches!(
        FilePaginator::open("notes.txt"),
        Err(DatabaseError::UnsupportedFormat(ext)) if ext == "txt"
    ));
    assert!(matches!(
        "json".parse::<FileFormat>(),
        Err(DatabaseError::UnsupportedFormat(_))
    ));
}

#[test]
fn browser_over_a_file() -> Result<()> {
    let state = State::new();
    let mut browser = PageBrowser::new(FilePaginator::open(state.csv("browse.csv", 45))?);

    let info = browser.load_initial_page()?;

    // a small file fits on a single default sized page
    assert_eq!(browser.page_size(), 45);
    assert_eq!(info.total_pages, 1);
    assert_eq!(browser.status_line(), "Page 1 of 1 (1-45 of 45 rows)");

    browser.set_page_size(20)?;
    browser.last()?;
    assert_eq!(browser.status_line(), "Page 3 of 3 (41-45 of 45 rows)");

    Ok(())
}
