use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome the bank reports for a deposited cheque.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankStatus {
    Cleared,
    Returned,
}

impl fmt::Display for BankStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cleared => "CLEARED",
            Self::Returned => "RETURNED",
        })
    }
}

/// One line of a bank statement extract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BankStatementEntry {
    /// Assigned from the line number when omitted.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub cheque_number: String,
    pub amount: Decimal,
    pub status: BankStatus,
}
