//! Validation and construction of new collection records.
//!
//! Everything here is synchronous; the collection service resolves the
//! customer and ids before calling [`prepare_collection`] and performs the
//! writes afterwards.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{ChequeDetails, Collection, Customer, PaymentType};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChequeInput {
    #[serde(default)]
    pub cheque_number: String,
    #[serde(default)]
    pub bank: String,
    #[serde(default)]
    pub branch: String,
    /// `YYYY-MM-DD`.
    pub realize_date: Option<String>,
    pub image_base64: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionRequest {
    #[serde(default)]
    pub customer_id: String,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub cheque: Option<ChequeInput>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingRules {
    /// Reject cheques whose realize date lies further out than the
    /// customer's credit period.
    pub enforce_credit_period: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordingError {
    #[error("customer is required")]
    MissingCustomer,

    #[error("unknown customer: {0}")]
    UnknownCustomer(String),

    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    #[error("cheque {0} is required")]
    MissingChequeField(&'static str),

    #[error("invalid realize date: {0}")]
    InvalidRealizeDate(String),

    #[error("realize date is {days} days out, beyond the {allowed} day credit period")]
    CreditPeriodExceeded { days: i64, allowed: u32 },
}

/// Check `request` and build the collection to persist.
///
/// `customer` is the record resolved for `request.customer_id`, if any.
/// Cheque details are dropped for non-cheque payments.
pub fn prepare_collection(
    request: CollectionRequest,
    customer: Option<&Customer>,
    rules: RecordingRules,
    today: NaiveDate,
    collection_id: String,
    created_by: Option<String>,
) -> Result<Collection, RecordingError> {
    let customer_id = request.customer_id.trim();
    if customer_id.is_empty() {
        return Err(RecordingError::MissingCustomer);
    }
    let customer = customer
        .filter(|c| c.customer_id == customer_id && !c.deleted)
        .ok_or_else(|| RecordingError::UnknownCustomer(customer_id.to_string()))?;

    if request.amount <= Decimal::ZERO {
        return Err(RecordingError::NonPositiveAmount);
    }

    let cheque = match request.payment_type {
        PaymentType::Cheque => Some(validate_cheque(
            request.cheque.unwrap_or_default(),
            customer,
            rules,
            today,
        )?),
        _ => None,
    };

    Ok(Collection {
        collection_id,
        customer_id: customer.customer_id.clone(),
        payment_type: request.payment_type,
        amount: request.amount,
        status: request.payment_type.initial_status(),
        cheque,
        collection_date: today,
        created_by,
    })
}

fn validate_cheque(
    input: ChequeInput,
    customer: &Customer,
    rules: RecordingRules,
    today: NaiveDate,
) -> Result<ChequeDetails, RecordingError> {
    let cheque_number = input.cheque_number.trim();
    if cheque_number.is_empty() {
        return Err(RecordingError::MissingChequeField("number"));
    }
    let bank = input.bank.trim();
    if bank.is_empty() {
        return Err(RecordingError::MissingChequeField("bank"));
    }
    let raw_date = input
        .realize_date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or(RecordingError::MissingChequeField("realize date"))?;
    let realize_date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
        .map_err(|_| RecordingError::InvalidRealizeDate(raw_date.to_string()))?;

    if rules.enforce_credit_period {
        let days = (realize_date - today).num_days();
        if days > i64::from(customer.credit_period_days) {
            return Err(RecordingError::CreditPeriodExceeded {
                days,
                allowed: customer.credit_period_days,
            });
        }
    }

    Ok(ChequeDetails {
        cheque_number: cheque_number.to_string(),
        bank: bank.to_string(),
        branch: input.branch.trim().to_string(),
        realize_date,
        image_base64: input.image_base64.filter(|s| !s.is_empty()),
    })
}
