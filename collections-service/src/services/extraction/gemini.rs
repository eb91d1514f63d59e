//! Gemini `generateContent` client for cheque extraction.

use super::{ChequeExtractor, ExtractedCheque, ExtractionError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Gemini API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

const EXTRACTION_PROMPT: &str = "Extract the following details from this cheque image: \
Cheque Number, Bank Name, Branch Name, Amount (numeric), and Date (YYYY-MM-DD format if possible). \
If a field is not visible, use null.";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Missing key leaves the extractor unconfigured; every call degrades.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
}

pub struct GeminiExtractor {
    config: GeminiConfig,
    client: Client,
}

impl GeminiExtractor {
    pub fn new(config: GeminiConfig) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ExtractionError::NetworkError(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn api_url(&self, api_key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.api_base.trim_end_matches('/'),
            self.config.model,
            api_key
        )
    }

    fn request_body(jpeg: &[u8]) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    ContentPart::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: STANDARD.encode(jpeg),
                        },
                    },
                    ContentPart::Text {
                        text: EXTRACTION_PROMPT.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: json!({
                    "type": "OBJECT",
                    "properties": {
                        "cheque_number": { "type": "STRING", "nullable": true },
                        "bank": { "type": "STRING", "nullable": true },
                        "branch": { "type": "STRING", "nullable": true },
                        "amount": { "type": "NUMBER", "nullable": true },
                        "date": { "type": "STRING", "nullable": true, "description": "YYYY-MM-DD format" }
                    }
                }),
            },
        }
    }
}

#[async_trait]
impl ChequeExtractor for GeminiExtractor {
    async fn extract(&self, jpeg: &[u8]) -> Result<ExtractedCheque, ExtractionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ExtractionError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;

        tracing::debug!(
            model = %self.config.model,
            image_bytes = jpeg.len(),
            "Sending cheque image to Gemini API"
        );

        let response = self
            .client
            .post(self.api_url(api_key))
            .json(&Self::request_body(jpeg))
            .send()
            .await
            .map_err(|e| ExtractionError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::ApiError(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        let text = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| {
                content.parts.into_iter().find_map(|p| match p {
                    ContentPart::Text { text } => Some(text),
                    _ => None,
                })
            })
            .ok_or_else(|| ExtractionError::MalformedResponse("no text in response".to_string()))?;

        serde_json::from_str(&text)
            .map_err(|e| ExtractionError::MalformedResponse(format!("invalid cheque JSON: {}", e)))
    }
}

// ============================================================================
// Gemini API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}
