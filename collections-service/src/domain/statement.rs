//! Bank statement extracts uploaded as CSV for cheque reconciliation.

use chrono::NaiveDate;
use thiserror::Error;

use super::csv_support::{parse_amount, read_table, value_at, value_or_position};
use crate::models::{BankStatementEntry, BankStatus};

const DATE_HEADERS: &[&str] = &["date", "value date", "transaction date", "txn date"];
const CHEQUE_NUMBER_HEADERS: &[&str] = &[
    "cheque number",
    "cheque no",
    "cheque_number",
    "check number",
    "chq no",
    "cheque",
];
const AMOUNT_HEADERS: &[&str] = &["amount", "value", "cheque amount"];
const STATUS_HEADERS: &[&str] = &["status", "bank status", "result"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

#[derive(Debug, Error)]
pub enum StatementError {
    #[error("Statement file seems empty or invalid format.")]
    Empty,

    #[error("No valid statement rows found (rejected lines: {rejected:?})")]
    NoValidRows { rejected: Vec<usize> },

    #[error("Failed to parse statement CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone)]
pub struct StatementExtract {
    pub entries: Vec<BankStatementEntry>,
    /// Data lines dropped for a missing cheque number, amount or status.
    pub rejected_rows: Vec<usize>,
}

/// Map a bank's status wording onto [`BankStatus`].
pub fn parse_bank_status(raw: &str) -> Option<BankStatus> {
    match raw.trim().to_uppercase().as_str() {
        "CLEARED" | "REALIZED" | "REALISED" => Some(BankStatus::Cleared),
        "RETURNED" | "BOUNCED" | "DISHONOURED" | "DISHONORED" => Some(BankStatus::Returned),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Parse a statement CSV. Entries keep file order, which decides
/// first-match-wins during matching.
pub fn parse_statement(text: &str) -> Result<StatementExtract, StatementError> {
    let table = read_table(text)?.ok_or(StatementError::Empty)?;

    let date_idx = table.header_index(DATE_HEADERS);
    let cheque_idx = table.header_index(CHEQUE_NUMBER_HEADERS);
    let amount_idx = table.header_index(AMOUNT_HEADERS);
    let status_idx = table.header_index(STATUS_HEADERS);

    let mut entries = Vec::with_capacity(table.rows.len());
    let mut rejected_rows = Vec::new();

    for (line, row) in &table.rows {
        let cheque_number = value_or_position(row, cheque_idx, 1);
        let amount = parse_amount(value_or_position(row, amount_idx, 2));
        let status = parse_bank_status(value_or_position(row, status_idx, 3));

        match (cheque_number.is_empty(), amount, status) {
            (false, Some(amount), Some(status)) => entries.push(BankStatementEntry {
                id: format!("S-{}", line),
                date: parse_date(value_at(row, date_idx.or(Some(0)))),
                cheque_number: cheque_number.to_string(),
                amount,
                status,
            }),
            _ => {
                tracing::debug!(line = *line, "Rejected statement row");
                rejected_rows.push(*line);
            }
        }
    }

    if entries.is_empty() {
        return Err(StatementError::NoValidRows {
            rejected: rejected_rows,
        });
    }

    Ok(StatementExtract {
        entries,
        rejected_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn parses_labelled_statement() {
        let text = "Date,Cheque No,Amount,Status\n\
                    2024-03-01,001,\"5,000.00\",cleared\n\
                    02/03/2024,002,1200,Bounced\n";
        let extract = parse_statement(text).unwrap();
        assert_eq!(extract.entries.len(), 2);

        let first = &extract.entries[0];
        assert_eq!(first.id, "S-1");
        assert_eq!(first.cheque_number, "001");
        assert_eq!(first.amount, Decimal::from(5000));
        assert_eq!(first.status, BankStatus::Cleared);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 3, 1));

        let second = &extract.entries[1];
        assert_eq!(second.status, BankStatus::Returned);
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2024, 3, 2));
    }

    #[test]
    fn unlabelled_columns_use_positions() {
        let text = "a;b;c;d\n2024-03-01;777;250.5;RETURNED\n";
        let entry = &parse_statement(text).unwrap().entries[0];
        assert_eq!(entry.cheque_number, "777");
        assert_eq!(entry.amount, Decimal::new(2505, 1));
        assert_eq!(entry.status, BankStatus::Returned);
    }

    #[test]
    fn bad_rows_are_reported_not_fatal() {
        let text = "date,cheque number,amount,status\n\
                    2024-03-01,001,abc,CLEARED\n\
                    2024-03-01,002,10,PENDING\n\
                    2024-03-01,,10,CLEARED\n\
                    2024-03-01,004,10,CLEARED\n";
        let extract = parse_statement(text).unwrap();
        assert_eq!(extract.entries.len(), 1);
        assert_eq!(extract.rejected_rows, vec![1, 2, 3]);
    }

    #[test]
    fn all_rows_rejected_is_an_error() {
        let text = "date,cheque number,amount,status\n2024-03-01,001,abc,CLEARED\n";
        match parse_statement(text) {
            Err(StatementError::NoValidRows { rejected }) => assert_eq!(rejected, vec![1]),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn status_synonyms() {
        assert_eq!(parse_bank_status(" realized "), Some(BankStatus::Cleared));
        assert_eq!(parse_bank_status("DISHONOURED"), Some(BankStatus::Returned));
        assert_eq!(parse_bank_status("pending"), None);
    }
}
