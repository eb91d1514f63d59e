use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use super::empty_or_warnings;
use crate::domain::access::Page;
use crate::middleware::ActingUser;
use crate::models::{CustomerInput, RouteInput};
use crate::startup::AppState;

pub async fn list_customers(
    State(state): State<AppState>,
    acting: ActingUser,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Customers)?;
    Ok(Json(state.admin.customers().await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    acting: ActingUser,
    Json(payload): Json<CustomerInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = acting.require(Page::Customers)?;
    let customer = state.admin.create_customer(payload, user).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    acting: ActingUser,
    Path(customer_id): Path<String>,
    Json(payload): Json<CustomerInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = acting.require(Page::Customers)?;
    Ok(Json(state.admin.update_customer(&customer_id, payload, user).await?))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    acting: ActingUser,
    Path(customer_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = acting.require(Page::Customers)?;
    let outcome = state.admin.delete_customer(&customer_id, user).await?;
    Ok(empty_or_warnings(StatusCode::NO_CONTENT, outcome.warnings))
}

/// Bulk import from a raw CSV body.
pub async fn import_customers(
    State(state): State<AppState>,
    acting: ActingUser,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let user = acting.require(Page::Customers)?;
    let summary = state.admin.import_customers(&body, user).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn list_routes(
    State(state): State<AppState>,
    acting: ActingUser,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Customers)?;
    Ok(Json(state.admin.routes().await?))
}

pub async fn create_route(
    State(state): State<AppState>,
    acting: ActingUser,
    Json(payload): Json<RouteInput>,
) -> Result<impl IntoResponse, AppError> {
    let user = acting.require(Page::Customers)?;
    let route = state.admin.create_route(payload, user).await?;
    Ok((StatusCode::CREATED, Json(route)))
}
