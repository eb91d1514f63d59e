//! Cheque image scanning.
//!
//! Uploaded photos are downscaled and re-encoded before being sent to a
//! [`ChequeExtractor`]. Any failure along the way degrades to manual entry:
//! the caller always gets a [`ChequeScan`], never an error.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::metrics::EXTRACTIONS_TOTAL;

pub use gemini::{GeminiConfig, GeminiExtractor};
pub use mock::MockExtractor;

pub const MAX_WIDTH: u32 = 1200;
pub const MAX_HEIGHT: u32 = 800;
pub const JPEG_QUALITY: u8 = 70;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Extractor not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ExtractionError {
    fn label(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "not_configured",
            Self::InvalidImage(_) => "invalid_image",
            Self::NetworkError(_) => "network_error",
            Self::ApiError(_) => "api_error",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Fields read off a cheque. Any of them may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedCheque {
    #[serde(default)]
    pub cheque_number: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// `YYYY-MM-DD` when the model could read it.
    #[serde(default)]
    pub date: Option<String>,
}

#[async_trait]
pub trait ChequeExtractor: Send + Sync {
    /// Read cheque fields from a JPEG image.
    async fn extract(&self, jpeg: &[u8]) -> Result<ExtractedCheque, ExtractionError>;
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Extracted,
    /// Extraction failed; the operator types the details in.
    Manual,
    /// Cheque camera switched off in settings.
    Disabled,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChequeScan {
    pub status: ScanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ExtractedCheque>,
    /// Compressed JPEG, base64, ready to store on the collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ChequeScan {
    fn manual(reason: &ExtractionError, image_base64: Option<String>) -> Self {
        Self {
            status: ScanStatus::Manual,
            fields: None,
            image_base64,
            message: Some(format!(
                "Could not read the cheque ({}). Please enter the details manually.",
                reason
            )),
        }
    }
}

/// Decode a base64 image, accepting a `data:image/...;base64,` prefix.
pub fn decode_image(data: &str) -> Result<Vec<u8>, ExtractionError> {
    let payload = data.split_once(',').map(|(_, rest)| rest).unwrap_or(data);
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ExtractionError::InvalidImage(format!("bad base64: {}", e)))
}

/// Downscale to fit within [`MAX_WIDTH`]×[`MAX_HEIGHT`] (aspect preserved)
/// and re-encode as JPEG at [`JPEG_QUALITY`].
pub fn compress_image(bytes: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ExtractionError::InvalidImage(e.to_string()))?;
    let img = if img.width() > MAX_WIDTH || img.height() > MAX_HEIGHT {
        img.resize(MAX_WIDTH, MAX_HEIGHT, FilterType::Triangle)
    } else {
        img
    };
    let rgb = img.to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| ExtractionError::InvalidImage(e.to_string()))?;
    Ok(out)
}

#[derive(Clone)]
pub struct ChequeScanner {
    extractor: Arc<dyn ChequeExtractor>,
}

impl ChequeScanner {
    pub fn new(extractor: Arc<dyn ChequeExtractor>) -> Self {
        Self { extractor }
    }

    /// Compress and read the cheque in `image_base64`. `camera_enabled`
    /// comes from the global settings.
    pub async fn scan(&self, image_base64: &str, camera_enabled: bool) -> ChequeScan {
        if !camera_enabled {
            EXTRACTIONS_TOTAL.with_label_values(&["disabled"]).inc();
            return ChequeScan {
                status: ScanStatus::Disabled,
                fields: None,
                image_base64: None,
                message: Some("Cheque camera is disabled in settings.".to_string()),
            };
        }

        let compressed = match decode_image(image_base64).and_then(|raw| compress_image(&raw)) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected cheque image");
                EXTRACTIONS_TOTAL.with_label_values(&[e.label()]).inc();
                return ChequeScan::manual(&e, None);
            }
        };
        let encoded = STANDARD.encode(&compressed);

        match self.extractor.extract(&compressed).await {
            Ok(fields) => {
                tracing::info!(
                    found_number = fields.cheque_number.is_some(),
                    found_amount = fields.amount.is_some(),
                    "Cheque details extracted"
                );
                EXTRACTIONS_TOTAL.with_label_values(&["extracted"]).inc();
                ChequeScan {
                    status: ScanStatus::Extracted,
                    fields: Some(fields),
                    image_base64: Some(encoded),
                    message: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cheque extraction failed, falling back to manual entry");
                EXTRACTIONS_TOTAL.with_label_values(&[e.label()]).inc();
                ChequeScan::manual(&e, Some(encoded))
            }
        }
    }
}
