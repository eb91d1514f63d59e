//! Storage abstraction over the document database.
//!
//! [`DataStore`] is implemented by [`MongoStore`](super::MongoStore) for
//! deployments and by [`InMemoryStore`](super::InMemoryStore) for tests and
//! local runs. Both broadcast a [`ChangeEvent`] after each successful write.

use async_trait::async_trait;
use serde::Serialize;
use service_core::error::AppError;
use tokio::sync::broadcast;

use crate::domain::reconciliation::StatusBatch;
use crate::models::{AuditLog, Collection, Customer, GlobalSettings, LedgerEntry, Route, User};

/// Capacity of the change broadcast channel. Slow subscribers skip ahead.
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreCollection {
    Customers,
    Routes,
    Collections,
    Ledger,
    AuditLogs,
    Users,
    Settings,
}

impl StoreCollection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Routes => "routes",
            Self::Collections => "collections",
            Self::Ledger => "ledger",
            Self::AuditLogs => "audit_logs",
            Self::Users => "users",
            Self::Settings => "system",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::Customers,
            Self::Routes,
            Self::Collections,
            Self::Ledger,
            Self::AuditLogs,
            Self::Users,
            Self::Settings,
        ]
        .into_iter()
        .find(|c| c.name() == name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChangeEvent {
    pub collection: StoreCollection,
    pub operation: ChangeOperation,
    /// Domain ids touched by the write, when known.
    pub ids: Vec<String>,
}

impl ChangeEvent {
    pub fn new(collection: StoreCollection, operation: ChangeOperation, ids: Vec<String>) -> Self {
        Self {
            collection,
            operation,
            ids,
        }
    }
}

#[async_trait]
pub trait DataStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    /// All customers, soft-deleted ones included.
    async fn list_customers(&self) -> Result<Vec<Customer>, AppError>;
    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, AppError>;
    async fn insert_customer(&self, customer: &Customer) -> Result<(), AppError>;
    /// Insert all customers or none.
    async fn insert_customers(&self, customers: &[Customer]) -> Result<(), AppError>;
    /// Replace an existing customer. `NotFound` when the id is unknown.
    async fn update_customer(&self, customer: &Customer) -> Result<(), AppError>;

    async fn list_routes(&self) -> Result<Vec<Route>, AppError>;
    async fn insert_route(&self, route: &Route) -> Result<(), AppError>;

    async fn list_collections(&self) -> Result<Vec<Collection>, AppError>;
    async fn get_collection(&self, collection_id: &str) -> Result<Option<Collection>, AppError>;
    async fn insert_collection(&self, collection: &Collection) -> Result<(), AppError>;

    /// Apply both status groups of `batch` atomically. Every id must still
    /// be a pending cheque, otherwise nothing changes and `Conflict` is
    /// returned. Returns the updated collections.
    async fn commit_status_batch(&self, batch: &StatusBatch) -> Result<Vec<Collection>, AppError>;

    async fn list_ledger(&self) -> Result<Vec<LedgerEntry>, AppError>;
    async fn insert_ledger_entry(&self, entry: &LedgerEntry) -> Result<(), AppError>;
    /// Returns the number of entries removed.
    async fn delete_ledger_entries(&self, entry_ids: &[String]) -> Result<u64, AppError>;

    async fn list_audit_logs(&self) -> Result<Vec<AuditLog>, AppError>;
    async fn insert_audit_log(&self, log: &AuditLog) -> Result<(), AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError>;
    /// Insert or replace by uid.
    async fn save_user(&self, user: &User) -> Result<(), AppError>;
    /// Returns whether a user was removed.
    async fn delete_user(&self, uid: &str) -> Result<bool, AppError>;

    async fn get_settings(&self) -> Result<Option<GlobalSettings>, AppError>;
    async fn save_settings(&self, settings: &GlobalSettings) -> Result<(), AppError>;

    /// Live feed of store writes.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}
