use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;

use super::empty_or_warnings;
use crate::domain::access::Page;
use crate::middleware::ActingUser;
use crate::models::{GlobalSettings, UserInput};
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub entry_ids: Vec<String>,
}

pub async fn list_ledger(
    State(state): State<AppState>,
    acting: ActingUser,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Ledger)?;
    Ok(Json(state.admin.ledger().await?))
}

pub async fn delete_ledger_entries(
    State(state): State<AppState>,
    acting: ActingUser,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = acting.require(Page::Ledger)?;
    Ok(Json(state.admin.delete_ledger_entries(&payload.entry_ids, user).await?))
}

pub async fn verify_ledger(
    State(state): State<AppState>,
    acting: ActingUser,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Ledger)?;
    Ok(Json(state.admin.verify_ledger().await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    acting: ActingUser,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Users)?;
    Ok(Json(state.admin.users().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    acting: ActingUser,
    Json(payload): Json<UserInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = acting.require(Page::Users)?;
    let created = state.admin.create_user(payload, user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_user(
    State(state): State<AppState>,
    acting: ActingUser,
    Path(uid): Path<String>,
    Json(payload): Json<UserInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = acting.require(Page::Users)?;
    Ok(Json(state.admin.update_user(&uid, payload, user).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    acting: ActingUser,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = acting.require(Page::Users)?;
    let outcome = state.admin.delete_user(&uid, user).await?;
    Ok(empty_or_warnings(StatusCode::NO_CONTENT, outcome.warnings))
}

/// Readable by every signed-in user; the collection form needs the camera
/// flag and credit defaults.
pub async fn get_settings(
    State(state): State<AppState>,
    _acting: ActingUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.admin.settings().await?))
}

pub async fn save_settings(
    State(state): State<AppState>,
    acting: ActingUser,
    Json(payload): Json<GlobalSettings>,
) -> Result<impl IntoResponse, AppError> {
    let user = acting.require(Page::Settings)?;
    Ok(Json(state.admin.save_settings(payload, user).await?))
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    acting: ActingUser,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Audit)?;
    Ok(Json(state.admin.audit_logs().await?))
}
