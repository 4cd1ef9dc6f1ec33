use crate::palette::{COMMAND, KEYWORD, LITERAL, RESET};
use rustyline::completion::Completer;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::Helper;
use std::borrow::Cow;

const KEYWORDS: &[&str] = &[
    "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "COUNT", "DESC", "DISTINCT", "ELSE",
    "END", "EXISTS", "FROM", "GROUP", "HAVING", "IN", "INNER", "IS", "JOIN", "LEFT", "LIKE",
    "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "SELECT", "THEN", "UNION",
    "WHEN", "WHERE", "WITH",
];

/// Colours SQL keywords, string literals and shell commands as they're typed.
pub(crate) struct SqlHighlighter;

impl Helper for SqlHighlighter {}

impl Completer for SqlHighlighter {
    type Candidate = String;
}

impl Hinter for SqlHighlighter {
    type Hint = String;
}

impl Validator for SqlHighlighter {}

impl Highlighter for SqlHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.trim_start().starts_with('\\') {
            return Cow::Owned(format!("{COMMAND}{line}{RESET}"));
        }

        let mut result = String::with_capacity(line.len());
        let mut current_word = String::new();
        let mut in_string = None;

        for ch in line.chars() {
            match ch {
                '"' | '\'' => match in_string {
                    Some(quote) if quote == ch => {
                        current_word.push(ch);
                        result.push_str(LITERAL);
                        result.push_str(&current_word);
                        result.push_str(RESET);
                        current_word.clear();
                        in_string = None;
                    }
                    Some(_) => current_word.push(ch),
                    None => {
                        Self::flush_word(&mut result, &current_word);
                        current_word.clear();
                        in_string = Some(ch);
                        current_word.push(ch);
                    }
                },
                _ if in_string.is_some() => current_word.push(ch),
                ' ' | '\n' | '\t' | '(' | ')' | ',' | ';' | '=' | '<' | '>' | '+' | '-' | '*'
                | '/' => {
                    Self::flush_word(&mut result, &current_word);
                    current_word.clear();
                    result.push(ch);
                }
                _ => current_word.push(ch),
            }
        }

        match in_string {
            Some(_) => {
                result.push_str(LITERAL);
                result.push_str(&current_word);
                result.push_str(RESET);
            }
            None => Self::flush_word(&mut result, &current_word),
        }

        Cow::Owned(result)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

impl SqlHighlighter {
    fn flush_word(result: &mut String, word: &str) {
        let is_keyword = KEYWORDS
            .iter()
            .any(|keyword| keyword.eq_ignore_ascii_case(word));

        if is_keyword {
            result.push_str(KEYWORD);
            result.push_str(word);
            result.push_str(RESET);
        } else {
            result.push_str(word);
        }
    }
}
