use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentType {
    Cash,
    #[serde(rename = "QR")]
    Qr,
    Card,
    Cheque,
}

impl PaymentType {
    pub const ALL: [PaymentType; 4] = [Self::Cash, Self::Qr, Self::Card, Self::Cheque];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::Qr => "QR",
            Self::Card => "Card",
            Self::Cheque => "Cheque",
        }
    }

    /// Card and cheque payments wait for the bank; cash and QR are final.
    pub fn initial_status(self) -> CollectionStatus {
        match self {
            Self::Card | Self::Cheque => CollectionStatus::Pending,
            Self::Cash | Self::Qr => CollectionStatus::Received,
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CollectionStatus {
    Received,
    Pending,
    Realized,
    Returned,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "Received",
            Self::Pending => "Pending",
            Self::Realized => "Realized",
            Self::Returned => "Returned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChequeDetails {
    pub cheque_number: String,
    pub bank: String,
    #[serde(default)]
    pub branch: String,
    pub realize_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
}

/// A single recorded customer payment. Only `status` changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    pub collection_id: String,
    pub customer_id: String,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub status: CollectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cheque: Option<ChequeDetails>,
    pub collection_date: NaiveDate,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl Collection {
    pub fn is_cheque(&self) -> bool {
        self.payment_type == PaymentType::Cheque
    }

    pub fn is_pending_cheque(&self) -> bool {
        self.is_cheque() && self.status == CollectionStatus::Pending
    }

    pub fn cheque_number(&self) -> Option<&str> {
        self.cheque.as_ref().map(|c| c.cheque_number.as_str())
    }
}
