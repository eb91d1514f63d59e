//! Login, logout and password reset against the identity provider.

use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;

use super::audit::append_audit;
use super::identity::IdentityProvider;
use crate::domain::access::{allowed_pages, Page};
use crate::models::{AuditAction, User};
use crate::services::DataStore;

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: User,
    pub pages: Vec<Page>,
}

impl Profile {
    pub fn for_user(user: User) -> Self {
        let pages = allowed_pages(&user);
        Self { user, pages }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub id_token: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn DataStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl SessionService {
    pub fn new(store: Arc<dyn DataStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    /// The stored profile for `uid`, if one exists.
    pub async fn resolve(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.store.get_user(uid).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::bad_request("email and password are required"));
        }
        let signed_in = self.identity.sign_in(email.trim(), password).await.map_err(|e| {
            tracing::warn!("Login failed: {}", e);
            AppError::from(e)
        })?;

        let mut warnings = Vec::new();
        let user = match self.store.get_user(&signed_in.uid).await? {
            Some(user) => user,
            None => {
                // First sign-in of an account provisioned outside the app.
                let user = User::fallback_for(signed_in.uid.clone(), &signed_in.email);
                match self.store.save_user(&user).await {
                    Ok(()) => {
                        tracing::info!(uid = %user.uid, "Created collector profile on first login");
                    }
                    Err(e) => {
                        tracing::error!(uid = %user.uid, "Failed to store fallback profile: {}", e);
                        warnings.push(format!("profile for {} not stored: {}", user.email, e));
                    }
                }
                user
            }
        };
        tracing::info!(uid = %user.uid, role = %user.role, "User logged in");
        warnings.extend(append_audit(self.store.as_ref(), AuditAction::Login, &user, "User logged in").await);

        Ok(LoginResponse {
            profile: Profile::for_user(user),
            id_token: signed_in.id_token,
            warnings,
        })
    }

    /// Returns the audit warning, if any.
    pub async fn logout(&self, actor: &User) -> Option<String> {
        tracing::info!(uid = %actor.uid, "User logged out");
        append_audit(self.store.as_ref(), AuditAction::Logout, actor, "User logged out").await
    }

    /// Sends the reset email. The audit entry is attributed to the stored
    /// profile with that email when there is one.
    pub async fn password_reset(&self, email: &str) -> Result<Option<String>, AppError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AppError::bad_request("email is required"));
        }
        self.identity.send_password_reset(&email).await?;
        tracing::info!("Password reset email sent");

        let users = self.store.list_users().await?;
        let actor = users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(&email))
            .unwrap_or_else(|| User::fallback_for("anonymous", &email));
        let warning = append_audit(
            self.store.as_ref(),
            AuditAction::PasswordReset,
            &actor,
            format!("Password reset requested for {}", email),
        )
        .await;
        Ok(warning)
    }
}
