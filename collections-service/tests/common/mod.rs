#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use collections_service::config::{CollectionsConfig, StoreBackend, StoreConfig, DEFAULT_MAX_UPLOAD_BYTES};
use collections_service::domain::recording::RecordingRules;
use collections_service::models::{Customer, CustomerStatus, Route, RouteStatus, User, UserRole};
use collections_service::services::extraction::gemini::{DEFAULT_GEMINI_MODEL, GEMINI_API_BASE};
use collections_service::services::identity::{IdentityError, SignIn, IDENTITY_API_BASE};
use collections_service::services::{
    ChequeExtractor, DataStore, GeminiConfig, IdentityConfig, IdentityProvider, InMemoryStore,
    MockExtractor,
};
use collections_service::startup::{build_router, AppState};
use rust_decimal::Decimal;
use serde_json::Value;
use service_core::config::Config;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const ADMIN_UID: &str = "admin-1";
pub const ACCOUNTS_UID: &str = "accounts-1";
pub const COLLECTOR_UID: &str = "collector-1";

pub fn test_config() -> CollectionsConfig {
    CollectionsConfig {
        common: Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Config::default()
        },
        service_name: "collections-service".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        store: StoreConfig {
            backend: StoreBackend::Memory,
            mongodb_uri: String::new(),
            mongodb_database: "distrifin_test".to_string(),
        },
        gemini: GeminiConfig {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_base: GEMINI_API_BASE.to_string(),
        },
        identity: IdentityConfig {
            api_key: None,
            api_base: IDENTITY_API_BASE.to_string(),
        },
        rules: RecordingRules::default(),
        allowed_origins: vec!["http://localhost:5173".to_string()],
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
    }
}

/// Identity provider backed by a map of email to (uid, password).
#[derive(Default)]
pub struct StubIdentity {
    pub accounts: Mutex<HashMap<String, (String, String)>>,
    pub resets_sent: Mutex<Vec<String>>,
    pub fail_resets: Mutex<bool>,
}

impl StubIdentity {
    pub fn with_account(self, email: &str, uid: &str, password: &str) -> Self {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (uid.to_string(), password.to_string()));
        self
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError> {
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some((uid, expected)) if expected == password => Ok(SignIn {
                uid: uid.clone(),
                email: email.to_string(),
                display_name: None,
                id_token: format!("token-{}", uid),
            }),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        if *self.fail_resets.lock().unwrap() {
            return Err(IdentityError::Rejected("EMAIL_NOT_FOUND".to_string()));
        }
        self.resets_sent.lock().unwrap().push(email.to_string());
        Ok(())
    }

    async fn create_account(&self, email: &str) -> Result<String, IdentityError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(IdentityError::EmailExists);
        }
        let uid = format!("uid-{}", accounts.len() + 1);
        accounts.insert(email.to_string(), (uid.clone(), String::new()));
        Ok(uid)
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub identity: Arc<StubIdentity>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config(), Arc::new(MockExtractor::default()), StubIdentity::default()).await
    }

    pub async fn spawn_with(
        config: CollectionsConfig,
        extractor: Arc<dyn ChequeExtractor>,
        identity: StubIdentity,
    ) -> Self {
        service_core::observability::init_test_tracing("collections_service=debug");

        let store = Arc::new(InMemoryStore::new());
        let identity = Arc::new(identity);
        let state = AppState::new(config, store.clone(), identity.clone(), extractor);
        let app = Self {
            router: build_router(state),
            store,
            identity,
        };
        app.seed_users().await;
        app
    }

    async fn seed_users(&self) {
        for (uid, name, role) in [
            (ADMIN_UID, "Ada Admin", UserRole::Admin),
            (ACCOUNTS_UID, "Ari Accounts", UserRole::Accounts),
            (COLLECTOR_UID, "Cole Collector", UserRole::Collector),
        ] {
            self.store
                .save_user(&User {
                    uid: uid.to_string(),
                    name: name.to_string(),
                    email: format!("{}@distrifin.test", uid),
                    role,
                    permissions: None,
                })
                .await
                .expect("Failed to seed user");
        }
    }

    pub async fn seed_route(&self, route_id: &str, route_name: &str) {
        self.store
            .insert_route(&Route {
                route_id: route_id.to_string(),
                route_name: route_name.to_string(),
                description: None,
                status: RouteStatus::Active,
            })
            .await
            .expect("Failed to seed route");
    }

    pub async fn seed_customer(&self, customer_id: &str, business_name: &str, route_id: &str) {
        self.store
            .insert_customer(&Customer {
                customer_id: customer_id.to_string(),
                customer_name: business_name.to_string(),
                business_name: business_name.to_string(),
                phone_number: "0771234567".to_string(),
                whatsapp_number: String::new(),
                address: String::new(),
                business_address: None,
                br_number: None,
                nic: None,
                date_of_birth: None,
                location: String::new(),
                credit_limit: Decimal::from(100_000),
                credit_period_days: 30,
                route_id: route_id.to_string(),
                status: CustomerStatus::Active,
                created_by: None,
                deleted: false,
            })
            .await
            .expect("Failed to seed customer");
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn get(&self, uid: &str, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .uri(uri)
                .header("x-user-id", uid)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uid: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.with_json("POST", uid, uri, body).await
    }

    pub async fn put_json(&self, uid: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.with_json("PUT", uid, uri, body).await
    }

    async fn with_json(&self, method: &str, uid: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("x-user-id", uid)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_text(&self, uid: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("x-user-id", uid)
                .header("content-type", "text/csv")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, uid: &str, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .header("x-user-id", uid)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }
}
