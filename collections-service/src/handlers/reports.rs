use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use service_core::error::AppError;

use crate::domain::access::Page;
use crate::domain::reports::{
    cheques_with_status, collections_csv, dashboard as dashboard_view, daily_collections as daily_view,
    route_summary as route_view, ChequeSortKey, CollectionSortKey, RouteSortKey, SortDirection, SortState,
};
use crate::middleware::ActingUser;
use crate::models::CollectionStatus;
use crate::startup::AppState;

#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Deserialize)]
pub struct DailyParams {
    pub sort: Option<CollectionSortKey>,
    pub direction: Option<SortDirection>,
    #[serde(default)]
    pub format: ReportFormat,
}

#[derive(Debug, Deserialize)]
pub struct ChequeParams {
    /// `Pending` (default) or `Returned`.
    pub status: Option<CollectionStatus>,
    pub sort: Option<ChequeSortKey>,
    pub direction: Option<SortDirection>,
}

#[derive(Debug, Deserialize)]
pub struct RouteParams {
    pub sort: Option<RouteSortKey>,
    pub direction: Option<SortDirection>,
}

pub async fn daily_collections(
    State(state): State<AppState>,
    acting: ActingUser,
    Query(params): Query<DailyParams>,
) -> Result<Response, AppError> {
    acting.require(Page::Reports)?;
    let collections = state.store.list_collections().await?;
    let customers = state.store.list_customers().await?;
    let rows = daily_view(
        &collections,
        &customers,
        SortState::from_parts(params.sort, params.direction),
    );

    if params.format == ReportFormat::Csv {
        let csv = collections_csv(&rows)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to write CSV: {}", e)))?;
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"collections.csv\""),
            ],
            csv,
        )
            .into_response());
    }
    Ok(Json(rows).into_response())
}

pub async fn cheques(
    State(state): State<AppState>,
    acting: ActingUser,
    Query(params): Query<ChequeParams>,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Reports)?;
    let status = params.status.unwrap_or(CollectionStatus::Pending);
    if !matches!(status, CollectionStatus::Pending | CollectionStatus::Returned) {
        return Err(AppError::bad_request("status must be Pending or Returned"));
    }
    let collections = state.store.list_collections().await?;
    Ok(Json(cheques_with_status(
        &collections,
        status,
        SortState::from_parts(params.sort, params.direction),
    )))
}

pub async fn route_summary(
    State(state): State<AppState>,
    acting: ActingUser,
    Query(params): Query<RouteParams>,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Reports)?;
    let routes = state.store.list_routes().await?;
    let customers = state.store.list_customers().await?;
    let collections = state.store.list_collections().await?;
    Ok(Json(route_view(
        &routes,
        &customers,
        &collections,
        SortState::from_parts(params.sort, params.direction),
    )))
}

pub async fn dashboard(
    State(state): State<AppState>,
    acting: ActingUser,
) -> Result<impl IntoResponse, AppError> {
    acting.require(Page::Dashboard)?;
    let collections = state.store.list_collections().await?;
    Ok(Json(dashboard_view(&collections, Utc::now().date_naive())))
}
