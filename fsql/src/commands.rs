use crate::palette::{COMMAND, HEADING, RESET};
use folio::pagination::Filter;
use std::path::PathBuf;
use std::str::FromStr;

/// Backslash commands understood by the shell.
#[derive(Debug, PartialEq)]
pub enum Command {
    Next,
    Previous,
    First,
    Last,
    /// Zero based page number.
    Page(usize),
    Size(usize),
    Filter(Filter),
    Clear,
    Memory,
    Export(PathBuf),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(command: &str) -> Result<Self, Self::Err> {
        let parts = command.split_whitespace().collect::<Vec<_>>();

        let command = match parts.as_slice() {
            ["\\n"] | ["\\next"] => Self::Next,
            ["\\p"] | ["\\prev"] => Self::Previous,
            ["\\first"] => Self::First,
            ["\\last"] => Self::Last,
            ["\\page", page] => match page.parse::<usize>() {
                Ok(page) if page > 0 => Self::Page(page - 1),
                _ => return Err(format!("Invalid page number: {page}")),
            },
            ["\\size", size] => match size.parse::<usize>() {
                Ok(size) if size > 0 => Self::Size(size),
                _ => return Err(format!("Invalid page size: {size}")),
            },
            ["\\filter", term, rest @ ..] => parse_filter(term, rest)?,
            ["\\clear"] | ["\\c"] => Self::Clear,
            ["\\mem"] => Self::Memory,
            ["\\export", path] => Self::Export(PathBuf::from(path)),
            ["\\h"] | ["\\help"] | ["\\?"] => Self::Help,
            ["\\q"] | ["\\quit"] => Self::Quit,
            _ => return Err(format!("Unknown command: {command}")),
        };

        Ok(command)
    }
}

fn parse_filter(term: &str, rest: &[&str]) -> Result<Command, String> {
    let filter = Filter::new(term);

    let filter = match rest {
        [] => filter,
        ["case"] => filter.case_sensitive(true),
        [column] => filter.column(*column),
        [column, "case"] => filter.column(*column).case_sensitive(true),
        _ => return Err("Usage: \\filter TERM [COLUMN] [case]".to_string()),
    };

    Ok(Command::Filter(filter))
}

pub fn print_help() {
    let entries = [
        ("\\n, \\next", "Show the next page"),
        ("\\p, \\prev", "Show the previous page"),
        ("\\first, \\last", "Jump to the first or last page"),
        ("\\page N", "Jump to page N"),
        ("\\size N", "Show N rows per page"),
        ("\\filter TERM [COLUMN] [case]", "Keep rows containing TERM"),
        ("\\clear, \\c", "Remove the filter"),
        ("\\mem", "Show memory usage"),
        ("\\export FILE", "Write every row to a CSV file"),
        ("\\h, \\help", "Show this help message"),
        ("\\q, \\quit", "Exit fsql"),
    ];

    println!("{HEADING}Available commands:{RESET}");
    for (command, description) in entries {
        println!("  {COMMAND}{command:<30}{RESET}{description}");
    }
    println!("Anything else is run as a SQL query, terminated by ';'.");
}
