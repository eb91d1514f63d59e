//! Bulk customer import from CSV exports.
//!
//! Header names are matched loosely (see [`normalize_header`]) and each logical
//! column falls back to a fixed position, so headerless or partially labelled
//! spreadsheets still import. A row is kept only when it has both a business
//! name and a phone number.
//!
//! [`normalize_header`]: super::csv_support::normalize_header

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use super::csv_support::{parse_amount, read_table, value_at, value_or_position};
use crate::models::{Customer, CustomerStatus, Route};

const BUSINESS_NAME_HEADERS: &[&str] = &[
    "business_name",
    "business name",
    "shop/business name",
    "shop name",
    "shop",
];
const CUSTOMER_NAME_HEADERS: &[&str] = &["customer_name", "customer name", "name"];
const PHONE_HEADERS: &[&str] = &[
    "phone_number",
    "phone number",
    "phone",
    "mobile",
    "mobile number",
];
const ADDRESS_HEADERS: &[&str] = &["residential address", "address"];
const WHATSAPP_HEADERS: &[&str] = &["whatsapp number", "whatsapp", "whatsapp_number"];
const CREDIT_LIMIT_HEADERS: &[&str] = &["credit limit ($)", "credit limit", "credit_limit"];
const CREDIT_PERIOD_HEADERS: &[&str] = &[
    "credit period (days)",
    "credit period",
    "credit_period_days",
];
const ROUTE_HEADERS: &[&str] = &[
    "assigned route",
    "assigned_route",
    "route",
    "route id",
    "route_id",
    "route name",
];

// Column order of the original customer template.
const BUSINESS_NAME_POS: usize = 0;
const CUSTOMER_NAME_POS: usize = 1;
const ROUTE_POS: usize = 2;
const PHONE_POS: usize = 3;
const WHATSAPP_POS: usize = 6;
const ADDRESS_POS: usize = 7;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("File seems empty or invalid format.")]
    Empty,

    #[error("No valid customer data found in file.")]
    NoValidRows,

    #[error("Failed to parse CSV file: {0}")]
    Csv(#[from] csv::Error),
}

/// Credit terms applied when a row leaves them blank or unreadable.
#[derive(Debug, Clone, Copy)]
pub struct ImportDefaults {
    pub credit_limit: Decimal,
    pub credit_period_days: u32,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            credit_limit: Decimal::from(50_000),
            credit_period_days: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub customers: Vec<Customer>,
    /// Line numbers (1-based, header excluded, blank lines skipped) that were
    /// dropped for lacking a business name or phone.
    pub skipped_rows: Vec<usize>,
}

/// Parse `text` into customer records. `batch` prefixes the generated ids
/// (`C-IMP-<batch>-<line>`).
pub fn parse_customers(
    text: &str,
    routes: &[Route],
    defaults: ImportDefaults,
    batch: &str,
    created_by: Option<&str>,
) -> Result<ImportOutcome, ImportError> {
    let table = read_table(text)?.ok_or(ImportError::Empty)?;

    let business_idx = table.header_index(BUSINESS_NAME_HEADERS);
    let customer_idx = table.header_index(CUSTOMER_NAME_HEADERS);
    let phone_idx = table.header_index(PHONE_HEADERS);
    let address_idx = table.header_index(ADDRESS_HEADERS);
    let whatsapp_idx = table.header_index(WHATSAPP_HEADERS);
    let credit_limit_idx = table.header_index(CREDIT_LIMIT_HEADERS);
    let credit_period_idx = table.header_index(CREDIT_PERIOD_HEADERS);
    let route_idx = table.header_index(ROUTE_HEADERS);

    let mut customers = Vec::new();
    let mut skipped_rows = Vec::new();

    for (line, row) in &table.rows {
        let business_name = value_or_position(row, business_idx, BUSINESS_NAME_POS);
        let phone = value_or_position(row, phone_idx, PHONE_POS);
        if business_name.is_empty() || phone.is_empty() {
            skipped_rows.push(*line);
            continue;
        }

        let customer_name = value_or_position(row, customer_idx, CUSTOMER_NAME_POS);
        let raw_route = value_or_position(row, route_idx, ROUTE_POS);

        customers.push(Customer {
            customer_id: format!("C-IMP-{}-{}", batch, line),
            customer_name: if customer_name.is_empty() {
                business_name.to_string()
            } else {
                customer_name.to_string()
            },
            business_name: business_name.to_string(),
            phone_number: phone.to_string(),
            whatsapp_number: value_or_position(row, whatsapp_idx, WHATSAPP_POS).to_string(),
            address: value_or_position(row, address_idx, ADDRESS_POS).to_string(),
            business_address: None,
            br_number: None,
            nic: None,
            date_of_birth: None,
            location: String::new(),
            credit_limit: parse_amount(value_at(row, credit_limit_idx))
                .unwrap_or(defaults.credit_limit),
            credit_period_days: parse_days(value_at(row, credit_period_idx))
                .unwrap_or(defaults.credit_period_days),
            route_id: resolve_route_id(raw_route, routes),
            status: CustomerStatus::Active,
            created_by: created_by.map(str::to_string),
            deleted: false,
        });
    }

    if customers.is_empty() {
        return Err(ImportError::NoValidRows);
    }

    tracing::debug!(
        imported = customers.len(),
        skipped = skipped_rows.len(),
        "Parsed customer import"
    );

    Ok(ImportOutcome {
        customers,
        skipped_rows,
    })
}

/// Accept a route id, a route name (case-insensitive), or keep the raw text.
pub fn resolve_route_id(raw: &str, routes: &[Route]) -> String {
    let value = raw.trim();
    if value.is_empty() {
        return String::new();
    }
    if routes.iter().any(|r| r.route_id == value) {
        return value.to_string();
    }
    let wanted = value.to_lowercase();
    routes
        .iter()
        .find(|r| r.route_name.trim().to_lowercase() == wanted)
        .map(|r| r.route_id.clone())
        .unwrap_or_else(|| value.to_string())
}

fn parse_days(raw: &str) -> Option<u32> {
    raw.parse::<u32>()
        .ok()
        .or_else(|| parse_amount(raw).and_then(|d| d.trunc().to_u32()))
}
