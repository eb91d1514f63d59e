//! Bank statement reconciliation: preview a match proposal, then confirm it.

use chrono::Utc;
use serde::Serialize;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;

use super::audit::append_audit;
use super::metrics::{LEDGER_POSTINGS, RECONCILIATION_OUTCOMES};
use crate::domain::ledger::reconciliation_posting;
use crate::domain::reconciliation::{
    assign_entry_ids, plan_confirmation, propose, ConfirmedMatch, ReconciliationProposal,
};
use crate::domain::statement::parse_statement;
use crate::models::{AuditAction, BankStatementEntry, Collection, CollectionStatus, User};
use crate::services::DataStore;

#[derive(Debug, Clone, Serialize)]
pub struct StatementPreview {
    #[serde(flatten)]
    pub proposal: ReconciliationProposal,
    pub statement: Vec<BankStatementEntry>,
    /// CSV lines that could not be read as statement entries.
    pub rejected_rows: Vec<usize>,
}

/// A ledger posting that could not be written after the status change.
#[derive(Debug, Clone, Serialize)]
pub struct PostingFailure {
    pub collection_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmOutcome {
    pub realized: Vec<Collection>,
    pub returned: Vec<Collection>,
    pub ledger_failures: Vec<PostingFailure>,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct ReconciliationService {
    store: Arc<dyn DataStore>,
}

impl ReconciliationService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Match the pending cheques against already-parsed statement entries.
    pub async fn preview(&self, mut statement: Vec<BankStatementEntry>) -> Result<StatementPreview, AppError> {
        assign_entry_ids(&mut statement)?;
        let collections = self.store.list_collections().await?;
        let proposal = propose(&collections, &statement);
        tracing::info!(
            statement_entries = statement.len(),
            matched = proposal.matches.len(),
            unmatched = proposal.unmatched.len(),
            ties = proposal.ties.len(),
            "Reconciliation preview"
        );
        Ok(StatementPreview {
            proposal,
            statement,
            rejected_rows: Vec::new(),
        })
    }

    pub async fn preview_csv(&self, text: &str) -> Result<StatementPreview, AppError> {
        let extract = parse_statement(text)?;
        let mut preview = self.preview(extract.entries).await?;
        preview.rejected_rows = extract.rejected_rows;
        Ok(preview)
    }

    /// Apply the reviewed matches. The proposal is recomputed from
    /// `statement` and each confirmed line must be one of its matches.
    /// Status changes for both groups commit together or not at all; the
    /// ledger postings that follow are written one by one and failures are
    /// reported back.
    pub async fn confirm(
        &self,
        mut statement: Vec<BankStatementEntry>,
        matches: &[ConfirmedMatch],
        actor: &User,
    ) -> Result<ConfirmOutcome, AppError> {
        assign_entry_ids(&mut statement)?;
        let collections = self.store.list_collections().await?;
        let proposal = propose(&collections, &statement);
        let batch = plan_confirmation(&proposal, matches).map_err(|e| {
            RECONCILIATION_OUTCOMES.with_label_values(&["rejected"]).inc();
            tracing::warn!(
                lines = matches.len(),
                statement_entries = statement.len(),
                "Confirmation does not fit the statement: {}",
                e
            );
            AppError::from(e)
        })?;

        let updated = match self.store.commit_status_batch(&batch).await {
            Ok(updated) => updated,
            Err(e) => {
                RECONCILIATION_OUTCOMES.with_label_values(&["rejected"]).inc();
                tracing::warn!(batch_size = batch.len(), "Reconciliation batch rejected: {}", e);
                return Err(e);
            }
        };
        let by_id: HashMap<&str, &Collection> =
            updated.iter().map(|c| (c.collection_id.as_str(), c)).collect();

        let mut realized = Vec::new();
        let mut returned = Vec::new();
        let mut ledger_failures = Vec::new();
        let posted_at = Utc::now();

        for (collection_id, status) in batch.iter() {
            let Some(collection) = by_id.get(collection_id).copied() else {
                continue;
            };
            let label = match status {
                CollectionStatus::Realized => "realized",
                _ => "returned",
            };
            RECONCILIATION_OUTCOMES.with_label_values(&[label]).inc();

            if let Some(entry) = reconciliation_posting(collection, status, Some(&actor.name), posted_at) {
                let kind = if status == CollectionStatus::Realized {
                    "cheque_realized"
                } else {
                    "cheque_returned"
                };
                match self.store.insert_ledger_entry(&entry).await {
                    Ok(()) => LEDGER_POSTINGS.with_label_values(&[kind, "ok"]).inc(),
                    Err(e) => {
                        LEDGER_POSTINGS.with_label_values(&[kind, "error"]).inc();
                        tracing::error!(collection_id, "Reconciliation posting failed: {}", e);
                        ledger_failures.push(PostingFailure {
                            collection_id: collection_id.to_string(),
                            error: e.to_string(),
                        });
                    }
                }
            }

            if status == CollectionStatus::Realized {
                realized.push(collection.clone());
            } else {
                returned.push(collection.clone());
            }
        }

        let mut warnings = Vec::new();
        for (group, status) in [(&batch.realized, CollectionStatus::Realized), (&batch.returned, CollectionStatus::Returned)] {
            if group.is_empty() {
                continue;
            }
            let details = format!("Marked {} cheque(s) as {}: {}", group.len(), status, group.join(", "));
            warnings.extend(append_audit(self.store.as_ref(), AuditAction::Reconcile, actor, details).await);
        }

        tracing::info!(
            realized = realized.len(),
            returned = returned.len(),
            ledger_failures = ledger_failures.len(),
            "Reconciliation confirmed"
        );

        Ok(ConfirmOutcome {
            realized,
            returned,
            ledger_failures,
            warnings,
        })
    }
}
