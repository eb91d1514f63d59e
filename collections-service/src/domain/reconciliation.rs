//! Cheque matching against bank statement extracts.
//!
//! A pending cheque matches the first statement entry carrying the same
//! cheque number and the same amount. Ambiguities are reported next to the
//! first-match result so the operator can review them before confirming.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::models::{BankStatementEntry, BankStatus, Collection, CollectionStatus};

/// Status a pending cheque takes for a given bank outcome.
pub fn target_status(status: BankStatus) -> CollectionStatus {
    match status {
        BankStatus::Cleared => CollectionStatus::Realized,
        BankStatus::Returned => CollectionStatus::Returned,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChequeMatch {
    pub collection_id: String,
    pub customer_id: String,
    pub cheque_number: String,
    pub amount: Decimal,
    pub statement_entry_id: String,
    pub bank_status: BankStatus,
    pub target_status: CollectionStatus,
}

/// A collection for which several statement entries qualified.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchTie {
    pub collection_id: String,
    pub candidate_entry_ids: Vec<String>,
}

/// A statement entry that was the first match of more than one collection.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SharedEntry {
    pub statement_entry_id: String,
    pub collection_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ReconciliationProposal {
    pub matches: Vec<ChequeMatch>,
    /// Pending cheques with no qualifying statement entry.
    pub unmatched: Vec<String>,
    pub ties: Vec<MatchTie>,
    pub shared_entries: Vec<SharedEntry>,
    /// Statement entries no collection matched.
    pub unused_entries: Vec<String>,
}

/// Match every pending cheque in `collections` against `statement`.
/// Non-cheque or already reconciled collections are ignored.
pub fn propose(collections: &[Collection], statement: &[BankStatementEntry]) -> ReconciliationProposal {
    let mut proposal = ReconciliationProposal::default();
    let mut claimed: HashMap<&str, Vec<String>> = HashMap::new();

    for collection in collections.iter().filter(|c| c.is_pending_cheque()) {
        let Some(number) = collection.cheque_number() else {
            proposal.unmatched.push(collection.collection_id.clone());
            continue;
        };

        let candidates: Vec<&BankStatementEntry> = statement
            .iter()
            .filter(|entry| entry.cheque_number == number && entry.amount == collection.amount)
            .collect();

        let Some(first) = candidates.first() else {
            proposal.unmatched.push(collection.collection_id.clone());
            continue;
        };

        if candidates.len() > 1 {
            proposal.ties.push(MatchTie {
                collection_id: collection.collection_id.clone(),
                candidate_entry_ids: candidates.iter().map(|e| e.id.clone()).collect(),
            });
        }

        claimed
            .entry(first.id.as_str())
            .or_default()
            .push(collection.collection_id.clone());

        proposal.matches.push(ChequeMatch {
            collection_id: collection.collection_id.clone(),
            customer_id: collection.customer_id.clone(),
            cheque_number: number.to_string(),
            amount: collection.amount,
            statement_entry_id: first.id.clone(),
            bank_status: first.status,
            target_status: target_status(first.status),
        });
    }

    for entry in statement {
        match claimed.get(entry.id.as_str()) {
            None => proposal.unused_entries.push(entry.id.clone()),
            Some(ids) if ids.len() > 1 => proposal.shared_entries.push(SharedEntry {
                statement_entry_id: entry.id.clone(),
                collection_ids: ids.clone(),
            }),
            Some(_) => {}
        }
    }

    proposal
}

/// One line of a reviewed proposal submitted for confirmation. Extra fields
/// of [`ChequeMatch`] are accepted and ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConfirmedMatch {
    pub collection_id: String,
    pub bank_status: BankStatus,
}

/// Collection ids grouped by the status they move to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusBatch {
    pub realized: Vec<String>,
    pub returned: Vec<String>,
}

impl StatusBatch {
    pub fn is_empty(&self) -> bool {
        self.realized.is_empty() && self.returned.is_empty()
    }

    pub fn len(&self) -> usize {
        self.realized.len() + self.returned.len()
    }

    /// `(collection_id, new status)` pairs, realized first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, CollectionStatus)> {
        self.realized
            .iter()
            .map(|id| (id.as_str(), CollectionStatus::Realized))
            .chain(
                self.returned
                    .iter()
                    .map(|id| (id.as_str(), CollectionStatus::Returned)),
            )
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ReconciliationError {
    #[error("no matches to confirm")]
    NothingToConfirm,

    #[error("collection {0} appears more than once in the confirmation")]
    DuplicateCollection(String),

    #[error("collection {0} has no matching entry on the statement")]
    NotMatched(String),

    #[error("collection {collection_id} matched a {matched} entry but was confirmed as {confirmed}")]
    StatusMismatch {
        collection_id: String,
        matched: BankStatus,
        confirmed: BankStatus,
    },

    #[error("statement entry id {0} appears more than once")]
    DuplicateStatementEntry(String),
}

/// Give every entry without an id the positional id `S-{n}` and reject
/// statements where two entries share an id.
pub fn assign_entry_ids(statement: &mut [BankStatementEntry]) -> Result<(), ReconciliationError> {
    for (idx, entry) in statement.iter_mut().enumerate() {
        entry.id = entry.id.trim().to_string();
        if entry.id.is_empty() {
            entry.id = format!("S-{}", idx + 1);
        }
    }
    let mut seen = HashSet::new();
    for entry in statement.iter() {
        if !seen.insert(entry.id.as_str()) {
            return Err(ReconciliationError::DuplicateStatementEntry(entry.id.clone()));
        }
    }
    Ok(())
}

/// Split the confirmed matches into the realized and returned groups.
///
/// `proposal` is the match result recomputed from the statement the operator
/// reviewed; every confirmed line must be one of its matches and carry the
/// same bank status.
pub fn plan_confirmation(
    proposal: &ReconciliationProposal,
    matches: &[ConfirmedMatch],
) -> Result<StatusBatch, ReconciliationError> {
    if matches.is_empty() {
        return Err(ReconciliationError::NothingToConfirm);
    }

    let proposed: HashMap<&str, &ChequeMatch> = proposal
        .matches
        .iter()
        .map(|m| (m.collection_id.as_str(), m))
        .collect();

    let mut seen = HashSet::new();
    let mut batch = StatusBatch::default();
    for m in matches {
        if !seen.insert(m.collection_id.as_str()) {
            return Err(ReconciliationError::DuplicateCollection(m.collection_id.clone()));
        }
        let matched = proposed
            .get(m.collection_id.as_str())
            .ok_or_else(|| ReconciliationError::NotMatched(m.collection_id.clone()))?;
        if matched.bank_status != m.bank_status {
            return Err(ReconciliationError::StatusMismatch {
                collection_id: m.collection_id.clone(),
                matched: matched.bank_status,
                confirmed: m.bank_status,
            });
        }
        match target_status(m.bank_status) {
            CollectionStatus::Realized => batch.realized.push(m.collection_id.clone()),
            _ => batch.returned.push(m.collection_id.clone()),
        }
    }
    Ok(batch)
}
