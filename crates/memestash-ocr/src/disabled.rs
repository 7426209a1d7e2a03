use crate::TextExtractor;
use async_trait::async_trait;
use std::path::Path;

/// No-op backend for deployments without OCR. Yields no text, so records
/// ingest with caption tags only.
pub struct DisabledExtractor;

#[async_trait]
impl TextExtractor for DisabledExtractor {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn extract_text(&self, _path: &Path) -> anyhow::Result<String> {
        Ok(String::new())
    }
}
