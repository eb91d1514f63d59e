//! Double-entry postings derived from collection events, and a checker for
//! the ledger's structural invariants.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::models::{
    Account, Collection, CollectionStatus, LedgerEntry, LedgerPostingKind, PaymentType,
    LEDGER_SCHEMA_VERSION,
};

/// Account debited when a payment of `payment_type` is collected.
pub fn debit_account_for(payment_type: PaymentType) -> Account {
    match payment_type {
        PaymentType::Cash => Account::CashInHand,
        PaymentType::Cheque => Account::ChequesInHand,
        PaymentType::Card => Account::BankPending,
        PaymentType::Qr => Account::BankQr,
    }
}

/// Posting for a newly recorded collection.
pub fn collection_posting(
    collection: &Collection,
    business_name: &str,
    collector: Option<&str>,
    posted_at: DateTime<Utc>,
) -> LedgerEntry {
    LedgerEntry {
        entry_id: Uuid::new_v4().to_string(),
        date: collection.collection_date,
        description: format!(
            "Collection from {} ({})",
            business_name, collection.payment_type
        ),
        reference_id: collection.collection_id.clone(),
        collector: collector.map(str::to_string),
        debit_account: debit_account_for(collection.payment_type),
        credit_account: Account::customer(&collection.customer_id),
        amount: collection.amount,
        kind: LedgerPostingKind::CollectionPosted,
        version: LEDGER_SCHEMA_VERSION,
        posted_at,
    }
}

/// Posting for a cheque moving to `status`. `None` for any status other
/// than Realized or Returned.
pub fn reconciliation_posting(
    collection: &Collection,
    status: CollectionStatus,
    collector: Option<&str>,
    posted_at: DateTime<Utc>,
) -> Option<LedgerEntry> {
    let (debit_account, kind, verb) = match status {
        CollectionStatus::Realized => (Account::BankMain, LedgerPostingKind::ChequeRealized, "realized"),
        CollectionStatus::Returned => (
            Account::customer(&collection.customer_id),
            LedgerPostingKind::ChequeReturned,
            "returned",
        ),
        _ => return None,
    };
    let number = collection.cheque_number().unwrap_or("-");

    Some(LedgerEntry {
        entry_id: Uuid::new_v4().to_string(),
        date: posted_at.date_naive(),
        description: format!("Cheque {} {}", number, verb),
        reference_id: collection.collection_id.clone(),
        collector: collector.map(str::to_string),
        debit_account,
        credit_account: Account::ChequesInHand,
        amount: collection.amount,
        kind,
        version: LEDGER_SCHEMA_VERSION,
        posted_at,
    })
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum LedgerViolation {
    OrphanEntry { entry_id: String, reference_id: String },
    MissingCollectionPosting { collection_id: String },
    DuplicateCollectionPosting { collection_id: String, count: usize },
    UnexpectedReconciliationPosting { collection_id: String, entry_id: String },
    DuplicateReconciliationPosting { collection_id: String, count: usize },
    MissingReconciliationPosting { collection_id: String },
    AmountMismatch { entry_id: String, collection_id: String },
}

impl fmt::Display for LedgerViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrphanEntry { entry_id, reference_id } => {
                write!(f, "entry {} references missing collection {}", entry_id, reference_id)
            }
            Self::MissingCollectionPosting { collection_id } => {
                write!(f, "collection {} has no collection posting", collection_id)
            }
            Self::DuplicateCollectionPosting { collection_id, count } => {
                write!(f, "collection {} has {} collection postings", collection_id, count)
            }
            Self::UnexpectedReconciliationPosting { collection_id, entry_id } => write!(
                f,
                "entry {} does not match the status of collection {}",
                entry_id, collection_id
            ),
            Self::DuplicateReconciliationPosting { collection_id, count } => {
                write!(f, "collection {} has {} reconciliation postings", collection_id, count)
            }
            Self::MissingReconciliationPosting { collection_id } => {
                write!(f, "reconciled collection {} has no reconciliation posting", collection_id)
            }
            Self::AmountMismatch { entry_id, collection_id } => write!(
                f,
                "entry {} amount differs from collection {}",
                entry_id, collection_id
            ),
        }
    }
}

/// Check `entries` against `collections`.
///
/// Reconciliation postings are non-atomic, so a reconciled cheque without
/// one is reported as [`LedgerViolation::MissingReconciliationPosting`]
/// rather than silently accepted.
pub fn verify_ledger(collections: &[Collection], entries: &[LedgerEntry]) -> Vec<LedgerViolation> {
    let by_id: HashMap<&str, &Collection> = collections
        .iter()
        .map(|c| (c.collection_id.as_str(), c))
        .collect();
    let mut postings: HashMap<&str, usize> = HashMap::new();
    let mut reconciliations: HashMap<&str, usize> = HashMap::new();
    let mut violations = Vec::new();

    for entry in entries {
        let Some(collection) = by_id.get(entry.reference_id.as_str()) else {
            violations.push(LedgerViolation::OrphanEntry {
                entry_id: entry.entry_id.clone(),
                reference_id: entry.reference_id.clone(),
            });
            continue;
        };

        if entry.amount != collection.amount {
            violations.push(LedgerViolation::AmountMismatch {
                entry_id: entry.entry_id.clone(),
                collection_id: collection.collection_id.clone(),
            });
        }

        let expected_kind = match collection.status {
            CollectionStatus::Realized => Some(LedgerPostingKind::ChequeRealized),
            CollectionStatus::Returned => Some(LedgerPostingKind::ChequeReturned),
            _ => None,
        };

        match entry.kind {
            LedgerPostingKind::CollectionPosted => {
                *postings.entry(collection.collection_id.as_str()).or_default() += 1;
            }
            kind if Some(kind) == expected_kind => {
                *reconciliations.entry(collection.collection_id.as_str()).or_default() += 1;
            }
            _ => violations.push(LedgerViolation::UnexpectedReconciliationPosting {
                collection_id: collection.collection_id.clone(),
                entry_id: entry.entry_id.clone(),
            }),
        }
    }

    for collection in collections {
        let id = collection.collection_id.as_str();
        match postings.get(id).copied().unwrap_or(0) {
            0 => violations.push(LedgerViolation::MissingCollectionPosting {
                collection_id: id.to_string(),
            }),
            1 => {}
            count => violations.push(LedgerViolation::DuplicateCollectionPosting {
                collection_id: id.to_string(),
                count,
            }),
        }

        if collection.is_cheque()
            && matches!(
                collection.status,
                CollectionStatus::Realized | CollectionStatus::Returned
            )
        {
            match reconciliations.get(id).copied().unwrap_or(0) {
                0 => violations.push(LedgerViolation::MissingReconciliationPosting {
                    collection_id: id.to_string(),
                }),
                1 => {}
                count => violations.push(LedgerViolation::DuplicateReconciliationPosting {
                    collection_id: id.to_string(),
                    count,
                }),
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChequeDetails;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn cheque(id: &str, status: CollectionStatus) -> Collection {
        Collection {
            collection_id: id.to_string(),
            customer_id: "C1".to_string(),
            payment_type: PaymentType::Cheque,
            amount: Decimal::from(5000),
            status,
            cheque: Some(ChequeDetails {
                cheque_number: "001".to_string(),
                bank: "BOC".to_string(),
                branch: String::new(),
                realize_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                image_base64: None,
            }),
            collection_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            created_by: None,
        }
    }

    #[test]
    fn debit_accounts_by_payment_type() {
        assert_eq!(debit_account_for(PaymentType::Cash), Account::CashInHand);
        assert_eq!(debit_account_for(PaymentType::Cheque), Account::ChequesInHand);
        assert_eq!(debit_account_for(PaymentType::Card), Account::BankPending);
        assert_eq!(debit_account_for(PaymentType::Qr), Account::BankQr);
    }

    #[test]
    fn cheque_collection_posts_to_cheques_in_hand() {
        let collection = cheque("COL-1", CollectionStatus::Pending);
        let entry = collection_posting(&collection, "Acme Store", Some("Sam"), Utc::now());
        assert_eq!(entry.debit_account, Account::ChequesInHand);
        assert_eq!(entry.credit_account, Account::customer("C1"));
        assert_eq!(entry.amount, Decimal::from(5000));
        assert_eq!(entry.description, "Collection from Acme Store (Cheque)");
        assert_eq!(entry.collector.as_deref(), Some("Sam"));
        assert_eq!(entry.kind, LedgerPostingKind::CollectionPosted);
    }

    #[test]
    fn reconciliation_postings_by_status() {
        let collection = cheque("COL-1", CollectionStatus::Pending);
        let realized =
            reconciliation_posting(&collection, CollectionStatus::Realized, None, Utc::now()).unwrap();
        assert_eq!(realized.debit_account, Account::BankMain);
        assert_eq!(realized.credit_account, Account::ChequesInHand);

        let returned =
            reconciliation_posting(&collection, CollectionStatus::Returned, None, Utc::now()).unwrap();
        assert_eq!(returned.debit_account, Account::customer("C1"));
        assert_eq!(returned.credit_account, Account::ChequesInHand);

        assert!(reconciliation_posting(&collection, CollectionStatus::Pending, None, Utc::now()).is_none());
    }

    #[test]
    fn consistent_ledger_has_no_violations() {
        let pending = cheque("COL-1", CollectionStatus::Pending);
        let realized = cheque("COL-2", CollectionStatus::Realized);
        let now = Utc::now();
        let entries = vec![
            collection_posting(&pending, "A", None, now),
            collection_posting(&realized, "A", None, now),
            reconciliation_posting(&realized, CollectionStatus::Realized, None, now).unwrap(),
        ];
        assert!(verify_ledger(&[pending, realized], &entries).is_empty());
    }

    #[test]
    fn detects_structural_violations() {
        let pending = cheque("COL-1", CollectionStatus::Pending);
        let returned = cheque("COL-2", CollectionStatus::Returned);
        let now = Utc::now();

        let mut wrong_amount = collection_posting(&pending, "A", None, now);
        wrong_amount.amount = Decimal::from(1);
        let mut orphan = collection_posting(&pending, "A", None, now);
        orphan.reference_id = "COL-404".to_string();
        let early = reconciliation_posting(&pending, CollectionStatus::Realized, None, now).unwrap();

        let entries = vec![wrong_amount.clone(), orphan, early.clone()];
        let violations = verify_ledger(&[pending, returned], &entries);

        assert!(violations.contains(&LedgerViolation::AmountMismatch {
            entry_id: wrong_amount.entry_id,
            collection_id: "COL-1".into(),
        }));
        assert!(violations.iter().any(|v| matches!(v, LedgerViolation::OrphanEntry { .. })));
        assert!(violations.contains(&LedgerViolation::UnexpectedReconciliationPosting {
            collection_id: "COL-1".into(),
            entry_id: early.entry_id,
        }));
        assert!(violations.contains(&LedgerViolation::MissingCollectionPosting {
            collection_id: "COL-2".into(),
        }));
        assert!(violations.contains(&LedgerViolation::MissingReconciliationPosting {
            collection_id: "COL-2".into(),
        }));
    }
}
