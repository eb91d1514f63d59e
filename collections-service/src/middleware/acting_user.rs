use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

use crate::domain::access::{self, Page};
use crate::models::User;
use crate::startup::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The user on whose behalf the request runs.
///
/// The uid comes from the `x-user-id` header set by the trusted frontend
/// after sign-in and is resolved against the stored user profiles. An
/// unknown or missing uid is rejected with 401.
#[derive(Debug, Clone)]
pub struct ActingUser(pub User);

impl ActingUser {
    /// 403 unless the user may open `page`.
    pub fn require(&self, page: Page) -> Result<&User, AppError> {
        access::require(&self.0, page)?;
        Ok(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ActingUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let uid = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing x-user-id header")))?;

        let user = state.session.resolve(uid).await?.ok_or_else(|| {
            tracing::warn!(uid, "Request for unknown user");
            AppError::Unauthorized(anyhow::anyhow!("Unknown user"))
        })?;

        tracing::Span::current().record("user_id", uid);

        Ok(ActingUser(user))
    }
}
