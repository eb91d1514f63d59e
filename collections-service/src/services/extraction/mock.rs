//! Canned extractor for tests and offline runs.

use super::{ChequeExtractor, ExtractedCheque, ExtractionError};
use async_trait::async_trait;

pub struct MockExtractor {
    result: Option<ExtractedCheque>,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::returning(ExtractedCheque::default())
    }
}

impl MockExtractor {
    pub fn returning(fields: ExtractedCheque) -> Self {
        Self {
            result: Some(fields),
        }
    }

    /// An extractor that always reports it is not configured.
    pub fn failing() -> Self {
        Self { result: None }
    }
}

#[async_trait]
impl ChequeExtractor for MockExtractor {
    async fn extract(&self, _jpeg: &[u8]) -> Result<ExtractedCheque, ExtractionError> {
        self.result
            .clone()
            .ok_or_else(|| ExtractionError::NotConfigured("mock extractor disabled".to_string()))
    }
}
