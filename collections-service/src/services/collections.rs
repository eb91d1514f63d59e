//! Collection recording: validate, persist, post to the ledger, audit.

use chrono::Utc;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

use super::audit::append_audit;
use super::metrics::{COLLECTIONS_RECORDED, LEDGER_POSTINGS};
use crate::domain::ledger::collection_posting;
use crate::domain::recording::{prepare_collection, CollectionRequest, RecordingRules};
use crate::models::{AuditAction, Collection, LedgerEntry, User};
use crate::services::DataStore;

#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub collection: Collection,
    /// `None` when the ledger write failed; see `warnings`.
    pub ledger_entry: Option<LedgerEntry>,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct CollectionService {
    store: Arc<dyn DataStore>,
    rules: RecordingRules,
}

impl CollectionService {
    pub fn new(store: Arc<dyn DataStore>, rules: RecordingRules) -> Self {
        Self { store, rules }
    }

    /// Record a payment. Validation and the collection write are surfaced
    /// as errors; the ledger and audit writes that follow are best effort.
    pub async fn record(&self, request: CollectionRequest, actor: &User) -> Result<RecordOutcome, AppError> {
        let customer_id = request.customer_id.trim().to_string();
        let customer = if customer_id.is_empty() {
            None
        } else {
            self.store.get_customer(&customer_id).await?
        };

        let collection = prepare_collection(
            request,
            customer.as_ref(),
            self.rules,
            Utc::now().date_naive(),
            Uuid::new_v4().to_string(),
            Some(actor.uid.clone()),
        )?;
        // prepare_collection only succeeds with a resolved customer.
        let business_name = customer
            .as_ref()
            .map(|c| c.business_name.as_str())
            .unwrap_or_default();

        self.store.insert_collection(&collection).await.map_err(|e| {
            tracing::error!(customer_id = %collection.customer_id, "Failed to persist collection: {}", e);
            e
        })?;
        COLLECTIONS_RECORDED
            .with_label_values(&[collection.payment_type.as_str()])
            .inc();
        tracing::info!(
            collection_id = %collection.collection_id,
            customer_id = %collection.customer_id,
            payment_type = %collection.payment_type,
            amount = %collection.amount,
            status = %collection.status,
            "Collection recorded"
        );

        let mut warnings = Vec::new();
        let entry = collection_posting(&collection, business_name, Some(&actor.name), Utc::now());
        let ledger_entry = match self.store.insert_ledger_entry(&entry).await {
            Ok(()) => {
                LEDGER_POSTINGS.with_label_values(&["collection_posted", "ok"]).inc();
                Some(entry)
            }
            Err(e) => {
                LEDGER_POSTINGS.with_label_values(&["collection_posted", "error"]).inc();
                tracing::error!(
                    collection_id = %collection.collection_id,
                    "Ledger posting failed; collection kept: {}",
                    e
                );
                warnings.push(format!("ledger entry not recorded: {}", e));
                None
            }
        };

        let details = format!(
            "Recorded {} {} from customer {}",
            collection.amount, collection.payment_type, collection.customer_id
        );
        warnings.extend(append_audit(self.store.as_ref(), AuditAction::CreateCollection, actor, details).await);

        Ok(RecordOutcome {
            collection,
            ledger_entry,
            warnings,
        })
    }

    pub async fn list(&self) -> Result<Vec<Collection>, AppError> {
        let mut collections = self.store.list_collections().await?;
        collections.sort_by(|a, b| b.collection_date.cmp(&a.collection_date));
        Ok(collections)
    }
}
