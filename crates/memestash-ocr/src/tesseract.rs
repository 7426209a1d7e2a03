//! Tesseract OCR backend, invoked as a subprocess.

use crate::TextExtractor;
use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Engine mode 3 (default) and page segmentation 6 (single uniform text
/// block) work well for meme-style images.
const TESSERACT_OEM: &str = "3";
const TESSERACT_PSM: &str = "6";

pub struct TesseractExtractor {
    binary: String,
    languages: String,
}

impl TesseractExtractor {
    pub fn new(binary: String, languages: String) -> Self {
        Self { binary, languages }
    }

    fn build_args(&self, path: &Path) -> Vec<String> {
        vec![
            path.display().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.languages.clone(),
            "--oem".to_string(),
            TESSERACT_OEM.to_string(),
            "--psm".to_string(),
            TESSERACT_PSM.to_string(),
        ]
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn extract_text(&self, path: &Path) -> anyhow::Result<String> {
        let output = Command::new(&self.binary)
            .args(self.build_args(path))
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.binary))?;

        if !output.status.success() {
            anyhow::bail!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(image = %path.display(), chars = text.len(), "tesseract recognition finished");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_carry_languages_and_segmentation_mode() {
        let extractor = TesseractExtractor::new("tesseract".into(), "eng+rus".into());
        let args = extractor.build_args(Path::new("/tmp/img.jpg"));
        assert_eq!(args[0], "/tmp/img.jpg");
        assert_eq!(args[1], "stdout");
        assert!(args.windows(2).any(|w| w == ["-l", "eng+rus"]));
        assert!(args.windows(2).any(|w| w == ["--psm", "6"]));
    }

    #[tokio::test]
    async fn missing_binary_is_an_error_not_a_panic() {
        let extractor =
            TesseractExtractor::new("/nonexistent/tesseract-binary".into(), "eng".into());
        let result = extractor.extract_text(Path::new("img.jpg")).await;
        assert!(result.is_err());
    }
}
