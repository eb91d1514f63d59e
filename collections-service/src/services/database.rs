//! MongoDB-backed [`DataStore`].

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use mongodb::{
    bson::{self, doc, Document},
    change_stream::event::OperationType,
    options::{IndexOptions, ReplaceOptions},
    Client as MongoClient, Collection as MongoCollection, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use service_core::error::AppError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::metrics::STORE_OPERATION_DURATION;
use super::store::{ChangeEvent, ChangeOperation, DataStore, StoreCollection, CHANGE_CHANNEL_CAPACITY};
use crate::domain::reconciliation::StatusBatch;
use crate::models::{
    AuditLog, Collection, CollectionStatus, Customer, GlobalSettings, LedgerEntry, PaymentType, Route, User,
};

const SETTINGS_ID: &str = "settings";

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
    changes: broadcast::Sender<ChangeEvent>,
    /// Set while the change stream forwards events; local writes are then
    /// not published a second time.
    watching: Arc<AtomicBool>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self {
            client,
            db,
            changes,
            watching: Arc::new(AtomicBool::new(false)),
        })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for collections-service");

        let unique = |keys: Document, name: &str| {
            IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(name.to_string())
                        .unique(true)
                        .build(),
                )
                .build()
        };
        let plain = |keys: Document, name: &str| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build()
        };

        self.customers()
            .create_index(unique(doc! { "customer_id": 1 }, "customer_id_unique"), None)
            .await?;
        self.routes()
            .create_index(unique(doc! { "route_id": 1 }, "route_id_unique"), None)
            .await?;
        self.collections()
            .create_index(unique(doc! { "collection_id": 1 }, "collection_id_unique"), None)
            .await?;
        self.collections()
            .create_index(
                plain(doc! { "payment_type": 1, "status": 1 }, "cheque_status_lookup"),
                None,
            )
            .await?;
        self.ledger()
            .create_index(unique(doc! { "entry_id": 1 }, "entry_id_unique"), None)
            .await?;
        self.ledger()
            .create_index(plain(doc! { "reference_id": 1 }, "reference_lookup"), None)
            .await?;
        self.audit_logs()
            .create_index(plain(doc! { "timestamp": -1 }, "timestamp_desc"), None)
            .await?;
        self.users()
            .create_index(unique(doc! { "uid": 1 }, "uid_unique"), None)
            .await?;

        tracing::info!("MongoDB indexes ready");
        Ok(())
    }

    /// Forward the database change stream onto the broadcast channel.
    ///
    /// Change streams need a replica set; on a standalone server the watcher
    /// logs a warning and exits, and only this process's own writes are
    /// published.
    pub fn spawn_change_watcher(&self) {
        let db = self.db.clone();
        let changes = self.changes.clone();
        let watching = self.watching.clone();
        tokio::spawn(async move {
            let mut stream = match db.watch(None, None).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "Change stream unavailable; live feed limited to local writes");
                    return;
                }
            };
            tracing::info!("Watching MongoDB change stream");
            watching.store(true, Ordering::SeqCst);
            while let Some(next) = stream.next().await {
                let event = match next {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Change stream failed");
                        break;
                    }
                };
                let Some(collection) = event
                    .ns
                    .as_ref()
                    .and_then(|ns| ns.coll.as_deref())
                    .and_then(StoreCollection::from_name)
                else {
                    continue;
                };
                let operation = match event.operation_type {
                    OperationType::Insert => ChangeOperation::Insert,
                    OperationType::Update | OperationType::Replace => ChangeOperation::Update,
                    OperationType::Delete => ChangeOperation::Delete,
                    _ => continue,
                };
                let ids = event
                    .full_document
                    .as_ref()
                    .and_then(|d| domain_id(collection, d))
                    .into_iter()
                    .collect();
                let _ = changes.send(ChangeEvent::new(collection, operation, ids));
            }
            watching.store(false, Ordering::SeqCst);
            tracing::warn!("Change stream closed; falling back to local publishing");
        });
    }

    fn publish(&self, collection: StoreCollection, operation: ChangeOperation, ids: Vec<String>) {
        if self.watching.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.changes.send(ChangeEvent::new(collection, operation, ids));
    }

    fn customers(&self) -> MongoCollection<Customer> {
        self.db.collection(StoreCollection::Customers.name())
    }

    fn routes(&self) -> MongoCollection<Route> {
        self.db.collection(StoreCollection::Routes.name())
    }

    fn collections(&self) -> MongoCollection<Collection> {
        self.db.collection(StoreCollection::Collections.name())
    }

    fn ledger(&self) -> MongoCollection<LedgerEntry> {
        self.db.collection(StoreCollection::Ledger.name())
    }

    fn audit_logs(&self) -> MongoCollection<AuditLog> {
        self.db.collection(StoreCollection::AuditLogs.name())
    }

    fn users(&self) -> MongoCollection<User> {
        self.db.collection(StoreCollection::Users.name())
    }

    fn system(&self) -> MongoCollection<Document> {
        self.db.collection(StoreCollection::Settings.name())
    }

    async fn find_all<T>(&self, collection: &MongoCollection<T>, operation: &str) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&[operation])
            .start_timer();
        let items = collection
            .find(None, None)
            .await?
            .try_collect::<Vec<T>>()
            .await?;
        timer.observe_duration();
        Ok(items)
    }

    async fn insert<T>(&self, collection: &MongoCollection<T>, item: &T, operation: &str) -> Result<(), AppError>
    where
        T: Serialize + Send + Sync,
    {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&[operation])
            .start_timer();
        collection.insert_one(item, None).await.map_err(|e| {
            tracing::error!(operation, "Insert failed: {}", e);
            AppError::from(e)
        })?;
        timer.observe_duration();
        Ok(())
    }
}

fn domain_id(collection: StoreCollection, document: &Document) -> Option<String> {
    let field = match collection {
        StoreCollection::Customers => "customer_id",
        StoreCollection::Routes => "route_id",
        StoreCollection::Collections => "collection_id",
        StoreCollection::Ledger => "entry_id",
        StoreCollection::AuditLogs => "log_id",
        StoreCollection::Users => "uid",
        StoreCollection::Settings => return Some(SETTINGS_ID.to_string()),
    };
    document.get_str(field).ok().map(str::to_string)
}

fn bson_error(e: impl std::fmt::Display) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("BSON conversion failed: {}", e))
}

#[async_trait]
impl DataStore for MongoStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        self.find_all(&self.customers(), "list_customers").await
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, AppError> {
        Ok(self
            .customers()
            .find_one(doc! { "customer_id": customer_id }, None)
            .await?)
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), AppError> {
        self.insert(&self.customers(), customer, "insert_customer").await?;
        self.publish(
            StoreCollection::Customers,
            ChangeOperation::Insert,
            vec![customer.customer_id.clone()],
        );
        Ok(())
    }

    async fn insert_customers(&self, customers: &[Customer]) -> Result<(), AppError> {
        if customers.is_empty() {
            return Ok(());
        }
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["insert_customers"])
            .start_timer();
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        if let Err(e) = self
            .customers()
            .insert_many_with_session(customers, None, &mut session)
            .await
        {
            tracing::error!(count = customers.len(), "Bulk customer insert failed: {}", e);
            let _ = session.abort_transaction().await;
            return Err(AppError::from(e));
        }
        session.commit_transaction().await?;
        timer.observe_duration();
        self.publish(
            StoreCollection::Customers,
            ChangeOperation::Insert,
            customers.iter().map(|c| c.customer_id.clone()).collect(),
        );
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), AppError> {
        let result = self
            .customers()
            .replace_one(doc! { "customer_id": &customer.customer_id }, customer, None)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::not_found(format!("customer {}", customer.customer_id)));
        }
        self.publish(
            StoreCollection::Customers,
            ChangeOperation::Update,
            vec![customer.customer_id.clone()],
        );
        Ok(())
    }

    async fn list_routes(&self) -> Result<Vec<Route>, AppError> {
        self.find_all(&self.routes(), "list_routes").await
    }

    async fn insert_route(&self, route: &Route) -> Result<(), AppError> {
        self.insert(&self.routes(), route, "insert_route").await?;
        self.publish(
            StoreCollection::Routes,
            ChangeOperation::Insert,
            vec![route.route_id.clone()],
        );
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<Collection>, AppError> {
        self.find_all(&self.collections(), "list_collections").await
    }

    async fn get_collection(&self, collection_id: &str) -> Result<Option<Collection>, AppError> {
        Ok(self
            .collections()
            .find_one(doc! { "collection_id": collection_id }, None)
            .await?)
    }

    async fn insert_collection(&self, collection: &Collection) -> Result<(), AppError> {
        self.insert(&self.collections(), collection, "insert_collection")
            .await?;
        self.publish(
            StoreCollection::Collections,
            ChangeOperation::Insert,
            vec![collection.collection_id.clone()],
        );
        Ok(())
    }

    async fn commit_status_batch(&self, batch: &StatusBatch) -> Result<Vec<Collection>, AppError> {
        let timer = STORE_OPERATION_DURATION
            .with_label_values(&["commit_status_batch"])
            .start_timer();
        let collections = self.collections();
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let groups = [
            (CollectionStatus::Realized, &batch.realized),
            (CollectionStatus::Returned, &batch.returned),
        ];
        for (status, ids) in groups {
            if ids.is_empty() {
                continue;
            }
            let filter = doc! {
                "collection_id": { "$in": ids.clone() },
                "payment_type": PaymentType::Cheque.as_str(),
                "status": CollectionStatus::Pending.as_str(),
            };
            let update = doc! { "$set": { "status": status.as_str() } };
            let outcome = collections
                .update_many_with_session(filter, update, None, &mut session)
                .await;
            let failure = match outcome {
                Ok(result) if result.modified_count == ids.len() as u64 => None,
                Ok(result) => Some(AppError::conflict(format!(
                    "{} of {} collections are no longer pending cheques",
                    ids.len() as u64 - result.modified_count,
                    ids.len()
                ))),
                Err(e) => Some(AppError::from(e)),
            };
            if let Some(err) = failure {
                tracing::warn!(status = %status, "Aborting status batch: {}", err);
                if let Err(e) = session.abort_transaction().await {
                    tracing::error!("Failed to abort status batch: {}", e);
                }
                return Err(err);
            }
        }

        session.commit_transaction().await?;
        timer.observe_duration();

        let all_ids: Vec<String> = batch.iter().map(|(id, _)| id.to_string()).collect();
        let updated = collections
            .find(doc! { "collection_id": { "$in": all_ids.clone() } }, None)
            .await?
            .try_collect::<Vec<Collection>>()
            .await?;
        self.publish(StoreCollection::Collections, ChangeOperation::Update, all_ids);
        Ok(updated)
    }

    async fn list_ledger(&self) -> Result<Vec<LedgerEntry>, AppError> {
        self.find_all(&self.ledger(), "list_ledger").await
    }

    async fn insert_ledger_entry(&self, entry: &LedgerEntry) -> Result<(), AppError> {
        self.insert(&self.ledger(), entry, "insert_ledger_entry").await?;
        self.publish(
            StoreCollection::Ledger,
            ChangeOperation::Insert,
            vec![entry.entry_id.clone()],
        );
        Ok(())
    }

    async fn delete_ledger_entries(&self, entry_ids: &[String]) -> Result<u64, AppError> {
        let filter = doc! { "entry_id": { "$in": entry_ids.to_vec() } };
        let present: Vec<String> = self
            .ledger()
            .distinct("entry_id", filter.clone(), None)
            .await?
            .into_iter()
            .filter_map(|id| id.as_str().map(str::to_owned))
            .collect();
        if present.is_empty() {
            return Ok(0);
        }
        let result = self
            .ledger()
            .delete_many(doc! { "entry_id": { "$in": present.clone() } }, None)
            .await?;
        if result.deleted_count > 0 {
            self.publish(StoreCollection::Ledger, ChangeOperation::Delete, present);
        }
        Ok(result.deleted_count)
    }

    async fn list_audit_logs(&self) -> Result<Vec<AuditLog>, AppError> {
        self.find_all(&self.audit_logs(), "list_audit_logs").await
    }

    async fn insert_audit_log(&self, log: &AuditLog) -> Result<(), AppError> {
        self.insert(&self.audit_logs(), log, "insert_audit_log").await?;
        self.publish(
            StoreCollection::AuditLogs,
            ChangeOperation::Insert,
            vec![log.log_id.clone()],
        );
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.find_all(&self.users(), "list_users").await
    }

    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "uid": uid }, None).await?)
    }

    async fn save_user(&self, user: &User) -> Result<(), AppError> {
        let options = ReplaceOptions::builder().upsert(true).build();
        let result = self
            .users()
            .replace_one(doc! { "uid": &user.uid }, user, options)
            .await?;
        let operation = if result.upserted_id.is_some() {
            ChangeOperation::Insert
        } else {
            ChangeOperation::Update
        };
        self.publish(StoreCollection::Users, operation, vec![user.uid.clone()]);
        Ok(())
    }

    async fn delete_user(&self, uid: &str) -> Result<bool, AppError> {
        let result = self.users().delete_one(doc! { "uid": uid }, None).await?;
        let removed = result.deleted_count > 0;
        if removed {
            self.publish(StoreCollection::Users, ChangeOperation::Delete, vec![uid.to_string()]);
        }
        Ok(removed)
    }

    async fn get_settings(&self) -> Result<Option<GlobalSettings>, AppError> {
        let Some(document) = self.system().find_one(doc! { "_id": SETTINGS_ID }, None).await? else {
            return Ok(None);
        };
        bson::from_document(document).map(Some).map_err(bson_error)
    }

    async fn save_settings(&self, settings: &GlobalSettings) -> Result<(), AppError> {
        let mut document = bson::to_document(settings).map_err(bson_error)?;
        document.insert("_id", SETTINGS_ID);
        let options = ReplaceOptions::builder().upsert(true).build();
        self.system()
            .replace_one(doc! { "_id": SETTINGS_ID }, document, options)
            .await?;
        self.publish(
            StoreCollection::Settings,
            ChangeOperation::Update,
            vec![SETTINGS_ID.to_string()],
        );
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
