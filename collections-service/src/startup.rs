use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::request_id_middleware;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{CollectionsConfig, StoreBackend};
use crate::handlers;
use crate::middleware::USER_ID_HEADER;
use crate::services::metrics::metrics_middleware;
use crate::services::{
    AdminService, ChequeExtractor, ChequeScanner, CollectionService, DataStore, GeminiExtractor,
    IdentityProvider, IdentityToolkitClient, InMemoryStore, MongoStore, ReconciliationService,
    SessionService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: CollectionsConfig,
    pub store: Arc<dyn DataStore>,
    pub collections: CollectionService,
    pub reconciliation: ReconciliationService,
    pub admin: AdminService,
    pub session: SessionService,
    pub scanner: ChequeScanner,
}

impl AppState {
    pub fn new(
        config: CollectionsConfig,
        store: Arc<dyn DataStore>,
        identity: Arc<dyn IdentityProvider>,
        extractor: Arc<dyn ChequeExtractor>,
    ) -> Self {
        Self {
            collections: CollectionService::new(store.clone(), config.rules),
            reconciliation: ReconciliationService::new(store.clone()),
            admin: AdminService::new(store.clone(), identity.clone()),
            session: SessionService::new(store.clone(), identity),
            scanner: ChequeScanner::new(extractor),
            store,
            config,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .route("/events", get(handlers::events::stream_changes))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/password-reset", post(handlers::auth::password_reset))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/me", get(handlers::auth::me))
        .route(
            "/collections",
            get(handlers::collections::list_collections)
                .post(handlers::collections::record_collection)
                .layer(upload_limit),
        )
        .route(
            "/collections/extract-cheque",
            post(handlers::collections::extract_cheque).layer(upload_limit),
        )
        .route("/cheques", get(handlers::collections::cheque_register))
        .route("/reconciliation/preview", post(handlers::reconciliation::preview))
        .route(
            "/reconciliation/preview-csv",
            post(handlers::reconciliation::preview_csv).layer(upload_limit),
        )
        .route("/reconciliation/confirm", post(handlers::reconciliation::confirm))
        .route(
            "/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/customers/:id",
            put(handlers::customers::update_customer).delete(handlers::customers::delete_customer),
        )
        .route(
            "/customers/import",
            post(handlers::customers::import_customers).layer(upload_limit),
        )
        .route(
            "/routes",
            get(handlers::customers::list_routes).post(handlers::customers::create_route),
        )
        .route("/reports/daily", get(handlers::reports::daily_collections))
        .route("/reports/cheques", get(handlers::reports::cheques))
        .route("/reports/routes", get(handlers::reports::route_summary))
        .route("/dashboard", get(handlers::reports::dashboard))
        .route("/ledger", get(handlers::admin::list_ledger))
        .route("/ledger/bulk-delete", post(handlers::admin::delete_ledger_entries))
        .route("/ledger/verify", get(handlers::admin::verify_ledger))
        .route(
            "/users",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        .route(
            "/users/:uid",
            put(handlers::admin::update_user).delete(handlers::admin::delete_user),
        )
        .route(
            "/settings",
            get(handlers::admin::get_settings).put(handlers::admin::save_settings),
        )
        .route("/audit-logs", get(handlers::admin::list_audit_logs))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    user_id = tracing::field::Empty,
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::AUTHORIZATION,
                    HeaderName::from_static(USER_ID_HEADER),
                ]),
        )
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: CollectionsConfig) -> Result<Self, AppError> {
        let store: Arc<dyn DataStore> = match config.store.backend {
            StoreBackend::Mongo => {
                let mongo = MongoStore::connect(&config.store.mongodb_uri, &config.store.mongodb_database)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to connect to MongoDB: {}", e);
                        e
                    })?;
                mongo.initialize_indexes().await.map_err(|e| {
                    tracing::error!("Failed to initialize database indexes: {}", e);
                    e
                })?;
                mongo.spawn_change_watcher();
                Arc::new(mongo)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on restart");
                Arc::new(InMemoryStore::new())
            }
        };

        let identity: Arc<dyn IdentityProvider> = Arc::new(
            IdentityToolkitClient::new(config.identity.clone())
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?,
        );
        let extractor: Arc<dyn ChequeExtractor> = Arc::new(
            GeminiExtractor::new(config.gemini.clone())
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?,
        );
        if config.gemini.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; cheque scans fall back to manual entry");
        }
        if config.identity.api_key.is_none() {
            tracing::warn!("IDENTITY_API_KEY not set; login and user provisioning are unavailable");
        }

        let state = AppState::new(config.clone(), store, identity, extractor);
        let app = build_router(state);

        let addr: SocketAddr = format!("{}:{}", config.common.host, config.common.port)
            .parse()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid listen address: {}", e)))?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .into_future();

        Ok(Self {
            port,
            server: Box::new(server),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
