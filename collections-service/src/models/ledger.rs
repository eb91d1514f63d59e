//! Double-entry ledger records.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bumped whenever the shape of [`LedgerEntry`] changes.
pub const LEDGER_SCHEMA_VERSION: u32 = 1;

/// The event that produced a ledger posting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerPostingKind {
    CollectionPosted,
    ChequeRealized,
    ChequeReturned,
}

/// Ledger account. Stored as its display string (`Bank:Main`, `Customer:C1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Account {
    CashInHand,
    ChequesInHand,
    BankPending,
    BankQr,
    BankMain,
    Customer(String),
    Other(String),
}

impl Account {
    pub fn customer(customer_id: impl Into<String>) -> Self {
        Self::Customer(customer_id.into())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CashInHand => f.write_str("CashInHand"),
            Self::ChequesInHand => f.write_str("ChequesInHand"),
            Self::BankPending => f.write_str("BankPending"),
            Self::BankQr => f.write_str("Bank:QR"),
            Self::BankMain => f.write_str("Bank:Main"),
            Self::Customer(id) => write!(f, "Customer:{}", id),
            Self::Other(name) => f.write_str(name),
        }
    }
}

impl From<String> for Account {
    fn from(value: String) -> Self {
        match value.as_str() {
            "CashInHand" => Self::CashInHand,
            "ChequesInHand" => Self::ChequesInHand,
            "BankPending" => Self::BankPending,
            "Bank:QR" => Self::BankQr,
            "Bank:Main" => Self::BankMain,
            _ => match value.strip_prefix("Customer:") {
                Some(id) => Self::Customer(id.to_string()),
                None => Self::Other(value),
            },
        }
    }
}

impl From<Account> for String {
    fn from(account: Account) -> Self {
        account.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub entry_id: String,
    pub date: NaiveDate,
    pub description: String,
    /// The originating collection.
    pub reference_id: String,
    #[serde(default)]
    pub collector: Option<String>,
    pub debit_account: Account,
    pub credit_account: Account,
    pub amount: Decimal,
    pub kind: LedgerPostingKind,
    #[serde(default = "default_version")]
    pub version: u32,
    pub posted_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    LEDGER_SCHEMA_VERSION
}
