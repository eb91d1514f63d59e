//! Identity provider client (Identity Toolkit REST API).
//!
//! Only credentials live with the provider. Roles and page permissions are
//! resolved from the `users` collection.

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const IDENTITY_API_BASE: &str = "https://identitytoolkit.googleapis.com/v1";

const TEMP_PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789!@#$%^&*";
const TEMP_PASSWORD_LEN: usize = 24;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Identity provider not configured")]
    NotConfigured,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account already exists for this email")]
    EmailExists,

    #[error("Identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignIn {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub id_token: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;

    /// Create an account with a throwaway password. Returns the new uid.
    /// The caller follows up with [`send_password_reset`](Self::send_password_reset)
    /// so the user picks their own password.
    async fn create_account(&self, email: &str) -> Result<String, IdentityError>;
}

/// Random password that is never shown to anyone.
pub fn temporary_password() -> String {
    let mut rng = rand::thread_rng();
    (0..TEMP_PASSWORD_LEN)
        .map(|_| TEMP_PASSWORD_ALPHABET[rng.gen_range(0..TEMP_PASSWORD_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub api_key: Option<String>,
    pub api_base: String,
}

pub struct IdentityToolkitClient {
    config: IdentityConfig,
    client: Client,
}

impl IdentityToolkitClient {
    pub fn new(config: IdentityConfig) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| IdentityError::NetworkError(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, IdentityError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(IdentityError::NotConfigured)?;
        let url = format!(
            "{}/accounts:{}?key={}",
            self.config.api_base.trim_end_matches('/'),
            method,
            api_key
        );

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let code = response
                .json::<ErrorEnvelope>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| status.to_string());
            tracing::warn!(method, status = %status, code = %code, "Identity provider call failed");
            return Err(map_error_code(&code));
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::Rejected(format!("unexpected response: {}", e)))
    }
}

fn map_error_code(code: &str) -> IdentityError {
    // Codes may carry a suffix, e.g. "WEAK_PASSWORD : Password should be ..."
    let head = code.split([' ', ':']).next().unwrap_or(code);
    match head {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            IdentityError::InvalidCredentials
        }
        "EMAIL_EXISTS" => IdentityError::EmailExists,
        _ => IdentityError::Rejected(code.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, IdentityError> {
        let response: SignInResponse = self
            .call(
                "signInWithPassword",
                &CredentialsRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(SignIn {
            uid: response.local_id,
            email: response.email.unwrap_or_else(|| email.to_string()),
            display_name: response.display_name.filter(|n| !n.is_empty()),
            id_token: response.id_token.unwrap_or_default(),
        })
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .call(
                "sendOobCode",
                &OobRequest {
                    request_type: "PASSWORD_RESET",
                    email,
                },
            )
            .await?;
        Ok(())
    }

    async fn create_account(&self, email: &str) -> Result<String, IdentityError> {
        let password = temporary_password();
        let response: SignInResponse = self
            .call(
                "signUp",
                &CredentialsRequest {
                    email,
                    password: &password,
                    return_secure_token: false,
                },
            )
            .await?;
        Ok(response.local_id)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'a str,
    email: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}
