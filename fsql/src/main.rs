mod commands;
mod highlight;
mod palette;

use commands::{Command, print_help};
use folio::db::{DatabaseError, Value};
use folio::os::{self, MemoryLevel};
use folio::pagination::{
    FileFormat, FilePaginator, PageBrowser, PaginationConfig, Paginator, ProgressFn, QueryPaginator,
};
use highlight::SqlHighlighter;
use palette::{ERROR, OK, RESET, STATUS, TIMING, WARNING};
use rusqlite::Connection;
use rustyline::{Editor, error::ReadlineError, history::DefaultHistory};
use std::{env, fs, path::Path, process, rc::Rc, time::Instant};
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "fsql > ";
const SQL_PROMPT: &str = "sql > ";
const SINGLE_QUOTE: &str = "string(')> ";
const DOUBLE_QUOTE: &str = "string(\") ";

const CONFIG_FILE: &str = "fsql.json";
const HISTORY_FILE: &str = "history.fsql";

type QueryBrowser = PageBrowser<QueryPaginator<Rc<Connection>>>;

/// What the shell is currently paging through.
enum Session {
    Idle,
    Query(QueryBrowser),
    File(PageBrowser<FilePaginator>),
}

/// Runs `$body` against whichever browser is open, `$idle` otherwise.
macro_rules! with_browser {
    ($session:expr, $browser:ident => $body:expr, $idle:expr) => {
        match $session {
            Session::Query($browser) => $body,
            Session::File($browser) => $body,
            Session::Idle => $idle,
        }
    };
}

struct Shell {
    connection: Option<Rc<Connection>>,
    config: PaginationConfig,
    session: Session,
}

impl Shell {
    /// Opens a tabular file straight away, anything else as a SQLite database.
    fn open(path: &str, config: PaginationConfig) -> folio::Result<Self> {
        let Ok(format) = FileFormat::from_path(path) else {
            let connection = Rc::new(Connection::open(path)?);
            println!("Connected to {path}");

            return Ok(Self {
                connection: Some(connection),
                config,
                session: Session::Idle,
            });
        };

        let paginator = FilePaginator::with_config(path, format, config.clone())?;
        let mut browser = PageBrowser::new(paginator);
        browser.load_initial_page()?;
        show(&browser);

        Ok(Self {
            connection: None,
            config,
            session: Session::File(browser),
        })
    }

    fn run(&mut self, sql: &str) -> folio::Result<()> {
        let Some(connection) = &self.connection else {
            return Err(DatabaseError::Other(
                "no database open, restart fsql with a SQLite file to run queries".into(),
            ));
        };

        if !is_query(sql) {
            connection.execute_batch(sql)?;
            println!("OK");
            return Ok(());
        }

        let paginator =
            QueryPaginator::with_config(Rc::clone(connection), sql, self.config.clone())?;
        let mut browser = PageBrowser::new(paginator);
        browser.load_initial_page()?;
        show(&browser);

        self.session = Session::Query(browser);
        Ok(())
    }

    fn execute(&mut self, command: Command) -> folio::Result<()> {
        match command {
            Command::Next => with_browser!(&mut self.session, browser => {
                match browser.next()? {
                    Some(_) => show(browser),
                    None => println!("Already on the last page"),
                }
            }, idle()),
            Command::Previous => with_browser!(&mut self.session, browser => {
                match browser.previous()? {
                    Some(_) => show(browser),
                    None => println!("Already on the first page"),
                }
            }, idle()),
            Command::First => with_browser!(&mut self.session, browser => {
                browser.first()?;
                show(browser);
            }, idle()),
            Command::Last => with_browser!(&mut self.session, browser => {
                browser.last()?;
                show(browser);
            }, idle()),
            Command::Page(page) => with_browser!(&mut self.session, browser => {
                let mut report = print_progress;
                let progress: ProgressFn<'_> = &mut report;
                browser.load_page_with(page, Some(progress))?;
                eprintln!();
                show(browser);
            }, idle()),
            Command::Size(size) => with_browser!(&mut self.session, browser => {
                browser.set_page_size(size)?;
                show(browser);
            }, idle()),
            Command::Filter(filter) => match &mut self.session {
                Session::Query(browser) => match browser.apply_filter(filter)? {
                    true => show(browser),
                    false => println!("Nothing to filter on"),
                },
                Session::File(_) => println!("Filters need a query, open a database instead"),
                Session::Idle => idle(),
            },
            Command::Clear => match &mut self.session {
                Session::Query(browser) => match browser.clear_filter()? {
                    true => show(browser),
                    false => println!("No filter applied"),
                },
                _ => println!("No filter applied"),
            },
            Command::Memory => self.memory(),
            Command::Export(path) => with_browser!(&mut self.session, browser => {
                let started = Instant::now();
                let rows = export(browser, &path)?;
                println!("{rows} rows written to {} ({:.2?})", path.display(), started.elapsed());
            }, idle()),
            Command::Help => print_help(),
            Command::Quit => {}
        }

        Ok(())
    }

    fn memory(&self) {
        let usage = os::process_memory_mb();
        let colour = match MemoryLevel::classify(usage, &self.config) {
            MemoryLevel::Normal => OK,
            MemoryLevel::Elevated => WARNING,
            MemoryLevel::Critical => ERROR,
        };

        println!("Process: {colour}{}{RESET}", os::format_memory_size(usage));

        let page = with_browser!(&self.session, browser => browser.page_info().copied(), None);
        if let Some(info) = page {
            println!("Page:    {}", os::format_memory_size(info.memory_usage_mb));
        }
    }
}

fn main() -> rustyline::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: fsql <database | file.csv | file.parquet | file.xlsx>");
        process::exit(1);
    };

    let config = match load_config(Path::new(CONFIG_FILE)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    };

    let mut shell = match Shell::open(&path, config) {
        Ok(shell) => shell,
        Err(err) => {
            eprintln!("Cannot open {path}: {err}");
            process::exit(1);
        }
    };

    let mut rsl = Editor::<SqlHighlighter, DefaultHistory>::new()?;
    rsl.set_helper(Some(SqlHighlighter));
    if rsl.load_history(HISTORY_FILE).is_err() {
        println!("No previous history")
    };

    println!("fsql | one page at a time.");
    println!("Type \\help for guidance, \\quit to leave.");

    let mut quote = None;
    let mut sql = String::new();
    let mut prompt = PROMPT;

    loop {
        let line = match rsl.readline(prompt) {
            Ok(line) => line,
            Err(err) => {
                match err {
                    ReadlineError::Interrupted => println!("CTRL-C"),
                    ReadlineError::Eof => println!("CTRL-D"),
                    other => println!("Error: {other:#?}"),
                }

                break;
            }
        };

        let trimmed = line.trim();
        if sql.is_empty() {
            if trimmed.is_empty() {
                continue;
            }

            if trimmed.starts_with('\\') {
                rsl.add_history_entry(trimmed)?;
                match trimmed.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        if let Err(err) = shell.execute(command) {
                            println!("{ERROR}{err}{RESET}");
                        }
                    }
                    Err(message) => println!("{message}"),
                }

                continue;
            }
        }

        for ch in line.chars() {
            match (quote, ch) {
                (None, '\'' | '"') => quote = Some(ch),
                (Some(opening), ch) if opening == ch => quote = None,
                _ => {}
            }
        }

        if !sql.is_empty() {
            sql.push('\n');
        }
        sql.push_str(&line);

        if quote.is_some() || !sql.trim_end().ends_with(';') {
            prompt = match quote {
                Some('"') => DOUBLE_QUOTE,
                Some(_) => SINGLE_QUOTE,
                None => SQL_PROMPT,
            };

            continue;
        }

        rsl.add_history_entry(&sql)?;

        let started = Instant::now();
        match shell.run(&sql) {
            Ok(()) => println!("{TIMING}({:.2?}){RESET}", started.elapsed()),
            Err(err) => println!("{ERROR}{err}{RESET}"),
        }

        sql.clear();
        prompt = PROMPT;
    }

    rsl.save_history(HISTORY_FILE)?;
    Ok(())
}

/// Reads [`CONFIG_FILE`] when present. Missing keys keep their defaults.
fn load_config(path: &Path) -> Result<PaginationConfig, String> {
    if !path.exists() {
        return Ok(PaginationConfig::default());
    }

    let content =
        fs::read_to_string(path).map_err(|err| format!("Cannot read {}: {err}", path.display()))?;
    let config: PaginationConfig = serde_json::from_str(&content)
        .map_err(|err| format!("Invalid {}: {err}", path.display()))?;
    config
        .validate()
        .map_err(|err| format!("Invalid {}: {err}", path.display()))?;

    Ok(config)
}

/// Statements that return rows go through the paginator, the rest run as is.
fn is_query(sql: &str) -> bool {
    let keyword = sql
        .trim_start()
        .split(|ch: char| ch.is_whitespace() || ch == '(')
        .next()
        .unwrap_or_default();

    ["SELECT", "WITH", "VALUES"]
        .iter()
        .any(|query| query.eq_ignore_ascii_case(keyword))
}

fn show<P: Paginator>(browser: &PageBrowser<P>) {
    if let Some(data) = browser.data() {
        println!("{data}");
    }
    println!("{STATUS}{}{RESET}", browser.status_line());
}

fn idle() {
    println!("Nothing to page through yet, run a query first");
}

fn print_progress(message: &str, percent: u8) {
    eprint!("\r\x1b[2K{message} ({percent}%)");
}

/// Writes every row of the browser's source to a CSV file, chunk by chunk.
fn export<P: Paginator>(browser: &mut PageBrowser<P>, path: &Path) -> folio::Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;

    // header first, an empty result still gets one
    let sample_size = browser.paginator().config().sample_size;
    let sample = browser.paginator().get_sample_data(sample_size);
    if !sample.columns.is_empty() {
        writer.write_record(&sample.columns)?;
    }

    let mut report = print_progress;
    let progress: ProgressFn<'_> = &mut report;

    let mut rows = 0;
    for chunk in browser.export_chunks(Some(progress)) {
        let chunk = chunk?;
        for tuple in &chunk.data.tuples {
            writer.write_record(tuple.iter().map(|value| match value {
                Value::Null => String::new(),
                other => other.to_string(),
            }))?;
        }
        rows += chunk.data.len();
    }

    writer.flush()?;
    eprintln!();

    Ok(rows)
}
