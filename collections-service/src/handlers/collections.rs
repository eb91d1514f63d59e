use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;

use crate::domain::access::Page;
use crate::domain::recording::CollectionRequest;
use crate::domain::reports::{cheque_register as register, register_default_sort, ChequeSortKey, SortDirection, SortState};
use crate::middleware::ActingUser;
use crate::startup::AppState;

pub async fn list_collections(
    State(state): State<AppState>,
    acting: ActingUser,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Collections)?;
    Ok(Json(state.collections.list().await?))
}

pub async fn record_collection(
    State(state): State<AppState>,
    acting: ActingUser,
    Json(payload): Json<CollectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = acting.require(Page::Collections)?;
    let outcome = state.collections.record(payload, user).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[derive(Debug, Deserialize)]
pub struct ExtractChequeRequest {
    /// Base64 image, optionally as a `data:` URL.
    pub image_base64: String,
}

/// Always answers 200; a failed read comes back as a manual-entry scan.
pub async fn extract_cheque(
    State(state): State<AppState>,
    acting: ActingUser,
    Json(payload): Json<ExtractChequeRequest>,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Collections)?;
    let settings = state.admin.settings().await?;
    let scan = state
        .scanner
        .scan(&payload.image_base64, settings.enable_cheque_camera)
        .await;
    Ok(Json(scan))
}

#[derive(Debug, Deserialize)]
pub struct ChequeRegisterParams {
    #[serde(default)]
    pub deposit_ready: bool,
    pub sort: Option<ChequeSortKey>,
    pub direction: Option<SortDirection>,
}

pub async fn cheque_register(
    State(state): State<AppState>,
    acting: ActingUser,
    Query(params): Query<ChequeRegisterParams>,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Cheques)?;
    let sort = SortState::from_parts(params.sort, params.direction).unwrap_or_else(register_default_sort);
    let collections = state.store.list_collections().await?;
    Ok(Json(register(&collections, params.deposit_ready, sort)))
}
