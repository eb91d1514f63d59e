use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;

use super::empty_or_warnings;
use crate::middleware::ActingUser;
use crate::services::session::Profile;
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.session.login(&payload.email, &payload.password).await?;
    Ok(Json(response))
}

pub async fn password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let warning = state.session.password_reset(&payload.email).await?;
    Ok(empty_or_warnings(StatusCode::ACCEPTED, warning.into_iter().collect()))
}

pub async fn logout(State(state): State<AppState>, ActingUser(user): ActingUser) -> Response {
    let warning = state.session.logout(&user).await;
    empty_or_warnings(StatusCode::NO_CONTENT, warning.into_iter().collect())
}

/// The acting user's profile and the pages they may open.
pub async fn me(ActingUser(user): ActingUser) -> Json<Profile> {
    Json(Profile::for_user(user))
}
