use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

use crate::domain::recording::RecordingRules;
use crate::services::extraction::gemini::{DEFAULT_GEMINI_MODEL, GEMINI_API_BASE};
use crate::services::identity::IDENTITY_API_BASE;
use crate::services::{GeminiConfig, IdentityConfig};

#[derive(Debug, Clone)]
pub struct CollectionsConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreConfig,
    pub gemini: GeminiConfig,
    pub identity: IdentityConfig,
    pub rules: RecordingRules,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
    /// Request body limit for cheque photos and CSV uploads.
    pub max_upload_bytes: usize,
}

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_database: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

impl CollectionsConfig {
    pub fn from_env() -> Result<Self, AppError> {
        // Handles .env and the APP__ prefix.
        let common = core_config::Config::load()?;
        let is_prod = common.is_production();

        let backend: StoreBackend = get_env("STORE_BACKEND", Some("mongo"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let mongodb_uri = match backend {
            StoreBackend::Mongo => get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
            StoreBackend::Memory => env::var("MONGODB_URI").unwrap_or_default(),
        };

        Ok(CollectionsConfig {
            service_name: get_env("SERVICE_NAME", Some("collections-service"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: optional_env("OTLP_ENDPOINT"),
            store: StoreConfig {
                backend,
                mongodb_uri,
                mongodb_database: get_env("MONGODB_DATABASE", Some("distrifin"), is_prod)?,
            },
            gemini: GeminiConfig {
                api_key: optional_env("GEMINI_API_KEY"),
                model: get_env("GEMINI_MODEL", Some(DEFAULT_GEMINI_MODEL), false)?,
                api_base: get_env("GEMINI_API_BASE", Some(GEMINI_API_BASE), false)?,
            },
            identity: IdentityConfig {
                api_key: optional_env("IDENTITY_API_KEY"),
                api_base: get_env("IDENTITY_API_BASE", Some(IDENTITY_API_BASE), false)?,
            },
            rules: RecordingRules {
                enforce_credit_period: parse_flag(optional_env("ENFORCE_CREDIT_PERIOD").as_deref()),
            },
            allowed_origins: get_env("CORS_ALLOWED_ORIGINS", Some("http://localhost:5173"), false)?
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            max_upload_bytes: parse_bytes(optional_env("MAX_UPLOAD_BYTES").as_deref())?,
            common,
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

fn parse_bytes(value: Option<&str>) -> Result<usize, AppError> {
    match value {
        None => Ok(DEFAULT_MAX_UPLOAD_BYTES),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(bytes) if bytes > 0 => Ok(bytes),
            _ => Err(AppError::ConfigError(anyhow::anyhow!(
                "MAX_UPLOAD_BYTES must be a positive byte count, got '{}'",
                raw
            ))),
        },
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod && default.is_none() {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!("{} is required but not set", key)))
            }
        }
    }
}
