//! Read-only projections over in-memory record lists.
//!
//! Every view is recomputed from its inputs on each call. Sorting is by a
//! single key and stable, so rows that compare equal keep their input order.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::models::{AuditLog, Collection, CollectionStatus, Customer, LedgerEntry, PaymentType, Route};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<K> {
    pub key: K,
    pub direction: SortDirection,
}

impl<K> SortState<K> {
    /// Sort from optional query parameters; no key means input order.
    pub fn from_parts(key: Option<K>, direction: Option<SortDirection>) -> Option<Self> {
        key.map(|key| Self {
            key,
            direction: direction.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollectionSortKey {
    Date,
    Customer,
    PaymentType,
    Amount,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChequeSortKey {
    Status,
    ChequeNumber,
    Bank,
    RealizeDate,
    Amount,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteSortKey {
    RouteName,
    CustomerCount,
    Total,
}

/// A collection joined with its customer's business name.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CollectionRow {
    #[serde(flatten)]
    pub collection: Collection,
    pub business_name: Option<String>,
}

fn business_names(customers: &[Customer]) -> HashMap<&str, &str> {
    customers
        .iter()
        .map(|c| (c.customer_id.as_str(), c.business_name.as_str()))
        .collect()
}

/// Every collection, joined with the customer's business name.
pub fn daily_collections(
    collections: &[Collection],
    customers: &[Customer],
    sort: Option<SortState<CollectionSortKey>>,
) -> Vec<CollectionRow> {
    let names = business_names(customers);
    let mut rows: Vec<CollectionRow> = collections
        .iter()
        .map(|c| CollectionRow {
            business_name: names.get(c.customer_id.as_str()).map(|n| n.to_string()),
            collection: c.clone(),
        })
        .collect();

    if let Some(sort) = sort {
        rows.sort_by(|a, b| {
            let ordering = match sort.key {
                CollectionSortKey::Date => a.collection.collection_date.cmp(&b.collection.collection_date),
                CollectionSortKey::Customer => a
                    .business_name
                    .as_deref()
                    .unwrap_or("")
                    .cmp(b.business_name.as_deref().unwrap_or("")),
                CollectionSortKey::PaymentType => a
                    .collection
                    .payment_type
                    .as_str()
                    .cmp(b.collection.payment_type.as_str()),
                CollectionSortKey::Amount => a.collection.amount.cmp(&b.collection.amount),
            };
            sort.direction.apply(ordering)
        });
    }
    rows
}

fn compare_cheques(a: &Collection, b: &Collection, key: ChequeSortKey) -> Ordering {
    match key {
        ChequeSortKey::Status => a.status.as_str().cmp(b.status.as_str()),
        ChequeSortKey::ChequeNumber => a.cheque_number().unwrap_or("").cmp(b.cheque_number().unwrap_or("")),
        ChequeSortKey::Bank => {
            let bank = |c: &Collection| c.cheque.as_ref().map(|d| d.bank.clone()).unwrap_or_default();
            bank(a).cmp(&bank(b))
        }
        ChequeSortKey::RealizeDate => {
            let date = |c: &Collection| c.cheque.as_ref().map(|d| d.realize_date);
            date(a).cmp(&date(b))
        }
        ChequeSortKey::Amount => a.amount.cmp(&b.amount),
    }
}

fn sort_cheques(cheques: &mut [Collection], sort: Option<SortState<ChequeSortKey>>) {
    if let Some(sort) = sort {
        cheques.sort_by(|a, b| sort.direction.apply(compare_cheques(a, b, sort.key)));
    }
}

/// Cheque collections currently in `status` (the pending and returned
/// cheque reports).
pub fn cheques_with_status(
    collections: &[Collection],
    status: CollectionStatus,
    sort: Option<SortState<ChequeSortKey>>,
) -> Vec<Collection> {
    let mut cheques: Vec<Collection> = collections
        .iter()
        .filter(|c| c.is_cheque() && c.status == status)
        .cloned()
        .collect();
    sort_cheques(&mut cheques, sort);
    cheques
}

/// Default ordering of the cheque register: latest realize date first.
pub fn register_default_sort() -> SortState<ChequeSortKey> {
    SortState {
        key: ChequeSortKey::RealizeDate,
        direction: SortDirection::Desc,
    }
}

/// All cheques, or only those still waiting for deposit when
/// `deposit_ready` is set.
pub fn cheque_register(
    collections: &[Collection],
    deposit_ready: bool,
    sort: SortState<ChequeSortKey>,
) -> Vec<Collection> {
    let mut cheques: Vec<Collection> = collections
        .iter()
        .filter(|c| c.is_cheque() && (!deposit_ready || c.status == CollectionStatus::Pending))
        .cloned()
        .collect();
    sort_cheques(&mut cheques, Some(sort));
    cheques
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteSummary {
    pub route_id: String,
    pub route_name: String,
    pub customer_count: usize,
    pub total: Decimal,
}

/// Per-route customer count and lifetime collection total. Soft-deleted
/// customers are not counted, but their collections still add to the total.
pub fn route_summary(
    routes: &[Route],
    customers: &[Customer],
    collections: &[Collection],
    sort: Option<SortState<RouteSortKey>>,
) -> Vec<RouteSummary> {
    let mut summaries: Vec<RouteSummary> = routes
        .iter()
        .map(|route| {
            let assigned: Vec<&Customer> = customers
                .iter()
                .filter(|c| c.route_id == route.route_id)
                .collect();
            let ids: HashSet<&str> = assigned.iter().map(|c| c.customer_id.as_str()).collect();
            let total: Decimal = collections
                .iter()
                .filter(|c| ids.contains(c.customer_id.as_str()))
                .map(|c| c.amount)
                .sum();
            RouteSummary {
                route_id: route.route_id.clone(),
                route_name: route.route_name.clone(),
                customer_count: assigned.iter().filter(|c| !c.deleted).count(),
                total,
            }
        })
        .collect();

    if let Some(sort) = sort {
        summaries.sort_by(|a, b| {
            let ordering = match sort.key {
                RouteSortKey::RouteName => a.route_name.cmp(&b.route_name),
                RouteSortKey::CustomerCount => a.customer_count.cmp(&b.customer_count),
                RouteSortKey::Total => a.total.cmp(&b.total),
            };
            sort.direction.apply(ordering)
        });
    }
    summaries
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentTypeTotal {
    pub payment_type: PaymentType,
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub date: NaiveDate,
    pub today_total: Decimal,
    pub today_count: usize,
    pub today_by_type: Vec<PaymentTypeTotal>,
    pub pending_cheque_count: usize,
    pub pending_cheque_value: Decimal,
    pub returned_cheque_count: usize,
}

pub fn dashboard(collections: &[Collection], today: NaiveDate) -> DashboardSummary {
    let todays: Vec<&Collection> = collections
        .iter()
        .filter(|c| c.collection_date == today)
        .collect();

    let today_by_type = PaymentType::ALL
        .iter()
        .map(|pt| {
            let of_type = todays.iter().filter(|c| c.payment_type == *pt);
            PaymentTypeTotal {
                payment_type: *pt,
                total: of_type.clone().map(|c| c.amount).sum(),
                count: of_type.count(),
            }
        })
        .collect();

    let pending: Vec<&Collection> = collections.iter().filter(|c| c.is_pending_cheque()).collect();

    DashboardSummary {
        date: today,
        today_total: todays.iter().map(|c| c.amount).sum(),
        today_count: todays.len(),
        today_by_type,
        pending_cheque_count: pending.len(),
        pending_cheque_value: pending.iter().map(|c| c.amount).sum(),
        returned_cheque_count: collections
            .iter()
            .filter(|c| c.is_cheque() && c.status == CollectionStatus::Returned)
            .count(),
    }
}

/// Ledger entries, newest date first; same-day entries by posting time.
pub fn ledger_newest_first(mut entries: Vec<LedgerEntry>) -> Vec<LedgerEntry> {
    entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.posted_at.cmp(&a.posted_at)));
    entries
}

pub fn audit_newest_first(mut logs: Vec<AuditLog>) -> Vec<AuditLog> {
    logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    logs
}

/// Render collection rows as CSV for download.
pub fn collections_csv(rows: &[CollectionRow]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "collection_id",
        "collection_date",
        "customer_id",
        "business_name",
        "payment_type",
        "status",
        "cheque_number",
        "amount",
    ])?;
    for row in rows {
        let c = &row.collection;
        writer.write_record([
            c.collection_id.clone(),
            c.collection_date.to_string(),
            c.customer_id.clone(),
            row.business_name.clone().unwrap_or_default(),
            c.payment_type.to_string(),
            c.status.to_string(),
            c.cheque_number().unwrap_or("").to_string(),
            c.amount.to_string(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
