//! Text extraction capability.
//!
//! Several backends have carried this job over the project's history
//! (classical OCR, vision-language models); they all reduce to one
//! polymorphic capability: `extract_text(image) -> text`. The ingestion
//! pipeline never depends on which backend is active and tolerates the
//! capability being absent entirely.

mod disabled;
mod tesseract;
mod vision;

use async_trait::async_trait;
use memestash_core::config::{OcrBackend, OcrConfig};
use std::path::Path;
use std::sync::Arc;

pub use disabled::DisabledExtractor;
pub use tesseract::TesseractExtractor;
pub use vision::VisionExtractor;

/// A text-extraction backend. Failures are surfaced as errors and treated
/// as best-effort by every caller.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Extract raw text from the image at `path`.
    async fn extract_text(&self, path: &Path) -> anyhow::Result<String>;
}

/// Select and construct the configured backend at startup.
pub fn create_extractor(config: &OcrConfig) -> anyhow::Result<Arc<dyn TextExtractor>> {
    let extractor: Arc<dyn TextExtractor> = match config.backend {
        OcrBackend::Tesseract => Arc::new(TesseractExtractor::new(
            config.tesseract_path.clone(),
            config.tesseract_languages.clone(),
        )),
        OcrBackend::Vision => Arc::new(VisionExtractor::new(
            config
                .vision_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("vision backend requires an API key"))?,
            config.vision_model.clone(),
        )?),
        OcrBackend::Disabled => Arc::new(DisabledExtractor),
    };
    tracing::info!(backend = extractor.name(), "text extraction backend selected");
    Ok(extractor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(backend: OcrBackend) -> OcrConfig {
        OcrConfig {
            backend,
            tesseract_path: "tesseract".into(),
            tesseract_languages: "eng+rus".into(),
            vision_api_key: None,
            vision_model: "claude-sonnet-4-20250514".into(),
        }
    }

    #[test]
    fn factory_selects_configured_backend() {
        let t = create_extractor(&base_config(OcrBackend::Tesseract)).unwrap();
        assert_eq!(t.name(), "tesseract");

        let d = create_extractor(&base_config(OcrBackend::Disabled)).unwrap();
        assert_eq!(d.name(), "disabled");
    }

    #[test]
    fn vision_without_key_is_a_startup_error() {
        assert!(create_extractor(&base_config(OcrBackend::Vision)).is_err());
    }
}
