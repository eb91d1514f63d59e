use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use service_core::error::AppError;

use crate::domain::access::Page;
use crate::domain::reconciliation::ConfirmedMatch;
use crate::middleware::ActingUser;
use crate::models::BankStatementEntry;
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub statement: Vec<BankStatementEntry>,
}

/// The statement the operator previewed and the matches they accepted.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub statement: Vec<BankStatementEntry>,
    pub matches: Vec<ConfirmedMatch>,
}

pub async fn preview(
    State(state): State<AppState>,
    acting: ActingUser,
    Json(payload): Json<PreviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Reconciliation)?;
    Ok(Json(state.reconciliation.preview(payload.statement).await?))
}

/// Statement uploaded as a raw CSV body.
pub async fn preview_csv(
    State(state): State<AppState>,
    acting: ActingUser,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Reconciliation)?;
    Ok(Json(state.reconciliation.preview_csv(&body).await?))
}

pub async fn confirm(
    State(state): State<AppState>,
    acting: ActingUser,
    Json(payload): Json<ConfirmRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = acting.require(Page::Reconciliation)?;
    let outcome = state
        .reconciliation
        .confirm(payload.statement, &payload.matches, user)
        .await?;
    Ok(Json(outcome))
}
