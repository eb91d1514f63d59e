//! In-process [`DataStore`] used by the test suite and `STORE_BACKEND=memory`.

use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::{broadcast, RwLock};

use super::store::{ChangeEvent, ChangeOperation, DataStore, StoreCollection, CHANGE_CHANNEL_CAPACITY};
use crate::domain::reconciliation::StatusBatch;
use crate::models::{AuditLog, Collection, Customer, GlobalSettings, LedgerEntry, Route, User};

/// Writes that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertCollection,
    InsertCustomers,
    CommitStatusBatch,
    InsertLedgerEntry,
    InsertAuditLog,
    SaveUser,
}

#[derive(Default)]
struct Tables {
    customers: Vec<Customer>,
    routes: Vec<Route>,
    collections: Vec<Collection>,
    ledger: Vec<LedgerEntry>,
    audit_logs: Vec<AuditLog>,
    users: Vec<User>,
    settings: Option<GlobalSettings>,
}

pub struct InMemoryStore {
    tables: RwLock<Tables>,
    changes: broadcast::Sender<ChangeEvent>,
    failures: Mutex<HashSet<FailPoint>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            tables: RwLock::new(Tables::default()),
            changes,
            failures: Mutex::new(HashSet::new()),
        }
    }

    /// Make every subsequent `point` write fail with a database error.
    pub fn fail_on(&self, point: FailPoint) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(point);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear();
        }
    }

    fn check(&self, point: FailPoint) -> Result<(), AppError> {
        let failing = self
            .failures
            .lock()
            .map(|f| f.contains(&point))
            .unwrap_or(false);
        if failing {
            tracing::warn!(?point, "Injected store failure");
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "injected failure at {:?}",
                point
            )));
        }
        Ok(())
    }

    fn publish(&self, collection: StoreCollection, operation: ChangeOperation, ids: Vec<String>) {
        // No receivers is not an error.
        let _ = self.changes.send(ChangeEvent::new(collection, operation, ids));
    }
}

#[async_trait]
impl DataStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        Ok(self.tables.read().await.customers.clone())
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .iter()
            .find(|c| c.customer_id == customer_id)
            .cloned())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), AppError> {
        {
            let mut tables = self.tables.write().await;
            if tables.customers.iter().any(|c| c.customer_id == customer.customer_id) {
                return Err(AppError::conflict(format!(
                    "customer {} already exists",
                    customer.customer_id
                )));
            }
            tables.customers.push(customer.clone());
        }
        self.publish(
            StoreCollection::Customers,
            ChangeOperation::Insert,
            vec![customer.customer_id.clone()],
        );
        Ok(())
    }

    async fn insert_customers(&self, customers: &[Customer]) -> Result<(), AppError> {
        self.check(FailPoint::InsertCustomers)?;
        {
            let mut tables = self.tables.write().await;
            let existing: HashSet<&str> = tables.customers.iter().map(|c| c.customer_id.as_str()).collect();
            if let Some(dup) = customers.iter().find(|c| existing.contains(c.customer_id.as_str())) {
                return Err(AppError::conflict(format!(
                    "customer {} already exists",
                    dup.customer_id
                )));
            }
            tables.customers.extend_from_slice(customers);
        }
        self.publish(
            StoreCollection::Customers,
            ChangeOperation::Insert,
            customers.iter().map(|c| c.customer_id.clone()).collect(),
        );
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), AppError> {
        {
            let mut tables = self.tables.write().await;
            let slot = tables
                .customers
                .iter_mut()
                .find(|c| c.customer_id == customer.customer_id)
                .ok_or_else(|| AppError::not_found(format!("customer {}", customer.customer_id)))?;
            *slot = customer.clone();
        }
        self.publish(
            StoreCollection::Customers,
            ChangeOperation::Update,
            vec![customer.customer_id.clone()],
        );
        Ok(())
    }

    async fn list_routes(&self) -> Result<Vec<Route>, AppError> {
        Ok(self.tables.read().await.routes.clone())
    }

    async fn insert_route(&self, route: &Route) -> Result<(), AppError> {
        self.tables.write().await.routes.push(route.clone());
        self.publish(
            StoreCollection::Routes,
            ChangeOperation::Insert,
            vec![route.route_id.clone()],
        );
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<Collection>, AppError> {
        Ok(self.tables.read().await.collections.clone())
    }

    async fn get_collection(&self, collection_id: &str) -> Result<Option<Collection>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .collections
            .iter()
            .find(|c| c.collection_id == collection_id)
            .cloned())
    }

    async fn insert_collection(&self, collection: &Collection) -> Result<(), AppError> {
        self.check(FailPoint::InsertCollection)?;
        self.tables.write().await.collections.push(collection.clone());
        self.publish(
            StoreCollection::Collections,
            ChangeOperation::Insert,
            vec![collection.collection_id.clone()],
        );
        Ok(())
    }

    async fn commit_status_batch(&self, batch: &StatusBatch) -> Result<Vec<Collection>, AppError> {
        self.check(FailPoint::CommitStatusBatch)?;
        let updated = {
            let mut tables = self.tables.write().await;

            // Validate every id before touching anything.
            let mut positions = Vec::with_capacity(batch.len());
            for (id, status) in batch.iter() {
                let position = tables
                    .collections
                    .iter()
                    .position(|c| c.collection_id == id && c.is_pending_cheque())
                    .ok_or_else(|| {
                        AppError::conflict(format!("collection {} is no longer a pending cheque", id))
                    })?;
                positions.push((position, status));
            }

            positions
                .into_iter()
                .map(|(position, status)| {
                    let collection = &mut tables.collections[position];
                    collection.status = status;
                    collection.clone()
                })
                .collect::<Vec<_>>()
        };
        self.publish(
            StoreCollection::Collections,
            ChangeOperation::Update,
            updated.iter().map(|c| c.collection_id.clone()).collect(),
        );
        Ok(updated)
    }

    async fn list_ledger(&self) -> Result<Vec<LedgerEntry>, AppError> {
        Ok(self.tables.read().await.ledger.clone())
    }

    async fn insert_ledger_entry(&self, entry: &LedgerEntry) -> Result<(), AppError> {
        self.check(FailPoint::InsertLedgerEntry)?;
        self.tables.write().await.ledger.push(entry.clone());
        self.publish(
            StoreCollection::Ledger,
            ChangeOperation::Insert,
            vec![entry.entry_id.clone()],
        );
        Ok(())
    }

    async fn delete_ledger_entries(&self, entry_ids: &[String]) -> Result<u64, AppError> {
        let removed: Vec<String> = {
            let mut tables = self.tables.write().await;
            let (gone, kept) = std::mem::take(&mut tables.ledger)
                .into_iter()
                .partition::<Vec<_>, _>(|e| entry_ids.contains(&e.entry_id));
            tables.ledger = kept;
            gone.into_iter().map(|e| e.entry_id).collect()
        };
        let count = removed.len() as u64;
        if !removed.is_empty() {
            self.publish(StoreCollection::Ledger, ChangeOperation::Delete, removed);
        }
        Ok(count)
    }

    async fn list_audit_logs(&self) -> Result<Vec<AuditLog>, AppError> {
        Ok(self.tables.read().await.audit_logs.clone())
    }

    async fn insert_audit_log(&self, log: &AuditLog) -> Result<(), AppError> {
        self.check(FailPoint::InsertAuditLog)?;
        self.tables.write().await.audit_logs.push(log.clone());
        self.publish(
            StoreCollection::AuditLogs,
            ChangeOperation::Insert,
            vec![log.log_id.clone()],
        );
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.uid == uid).cloned())
    }

    async fn save_user(&self, user: &User) -> Result<(), AppError> {
        self.check(FailPoint::SaveUser)?;
        let operation = {
            let mut tables = self.tables.write().await;
            match tables.users.iter_mut().find(|u| u.uid == user.uid) {
                Some(slot) => {
                    *slot = user.clone();
                    ChangeOperation::Update
                }
                None => {
                    tables.users.push(user.clone());
                    ChangeOperation::Insert
                }
            }
        };
        self.publish(StoreCollection::Users, operation, vec![user.uid.clone()]);
        Ok(())
    }

    async fn delete_user(&self, uid: &str) -> Result<bool, AppError> {
        let removed = {
            let mut tables = self.tables.write().await;
            let before = tables.users.len();
            tables.users.retain(|u| u.uid != uid);
            tables.users.len() != before
        };
        if removed {
            self.publish(StoreCollection::Users, ChangeOperation::Delete, vec![uid.to_string()]);
        }
        Ok(removed)
    }

    async fn get_settings(&self) -> Result<Option<GlobalSettings>, AppError> {
        Ok(self.tables.read().await.settings.clone())
    }

    async fn save_settings(&self, settings: &GlobalSettings) -> Result<(), AppError> {
        self.tables.write().await.settings = Some(settings.clone());
        self.publish(
            StoreCollection::Settings,
            ChangeOperation::Update,
            vec!["settings".to_string()],
        );
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
