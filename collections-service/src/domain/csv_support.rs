//! Helpers shared by the customer import and bank statement parsers.

use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Lowercase, map `_`/`-` and punctuation to spaces and collapse whitespace, so
/// `Credit_Limit ($)` and `credit limit` compare equal.
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim_start_matches('\u{feff}').trim().to_lowercase();
    let mapped: String = lowered
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `;` when the header line has more semicolons than commas, `,` otherwise.
pub fn guess_delimiter(header_line: &str) -> u8 {
    let commas = header_line.matches(',').count();
    let semicolons = header_line.matches(';').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// A parsed delimited text file: normalized headers plus data rows with
/// their 1-based line numbers in the non-blank line sequence.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<(usize, Vec<String>)>,
}

impl Table {
    /// Index of the first candidate header present in the file.
    pub fn header_index(&self, candidates: &[&str]) -> Option<usize> {
        candidates.iter().find_map(|candidate| {
            let wanted = normalize_header(candidate);
            self.headers.iter().position(|h| *h == wanted)
        })
    }
}

/// Split `text` into a header row and data rows. Blank lines are dropped.
/// Returns `None` when fewer than two non-blank lines remain.
///
/// Every line is parsed on its own, so quoting never spans lines and an
/// unbalanced quote only affects the row it appears in.
pub fn read_table(text: &str) -> Result<Option<Table>, csv::Error> {
    let text = text.trim_start_matches('\u{feff}');
    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim_end())
        .filter(|l| !l.trim().is_empty())
        .collect();
    if lines.len() < 2 {
        return Ok(None);
    }

    let delimiter = guess_delimiter(lines[0]);
    let headers = split_line(lines[0], delimiter)?
        .iter()
        .map(|h| normalize_header(h))
        .collect();

    let mut rows = Vec::with_capacity(lines.len() - 1);
    for (offset, line) in lines[1..].iter().enumerate() {
        rows.push((offset + 1, split_line(line, delimiter)?));
    }

    Ok(Some(Table { headers, rows }))
}

fn split_line(line: &str, delimiter: u8) -> Result<Vec<String>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());
    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(str::to_string).collect()),
        None => Ok(Vec::new()),
    }
}

/// Trimmed cell value, empty when the index is missing or out of range.
pub fn value_at(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(|v| v.trim()).unwrap_or("")
}

/// Value under the resolved header, falling back to a fixed column when the
/// header is unknown or its cell is empty.
pub fn value_or_position<'a>(row: &'a [String], idx: Option<usize>, fallback: usize) -> &'a str {
    let value = value_at(row, idx);
    if value.is_empty() {
        value_at(row, Some(fallback))
    } else {
        value
    }
}

/// Parse a money cell, tolerating thousands separators and spaces.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{a0}'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}
