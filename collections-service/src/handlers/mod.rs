pub mod admin;
pub mod auth;
pub mod collections;
pub mod customers;
pub mod events;
pub mod health;
pub mod reconciliation;
pub mod reports;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// A bodiless `status`, or the warnings raised along the way. Warnings turn
/// a 204 into a 200 so they can carry a body.
pub(crate) fn empty_or_warnings(status: StatusCode, warnings: Vec<String>) -> Response {
    if warnings.is_empty() {
        return status.into_response();
    }
    let status = if status == StatusCode::NO_CONTENT { StatusCode::OK } else { status };
    (status, Json(json!({ "warnings": warnings }))).into_response()
}
