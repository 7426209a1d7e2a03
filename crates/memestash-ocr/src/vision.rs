//! Vision-language-model OCR backend over the Anthropic Messages API.
//!
//! The image is sent base64-inline with a transcription-only prompt; the
//! reply text is returned raw and goes through the same normalization as
//! any other OCR output.

use crate::TextExtractor;
use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
const PROMPT: &str = "Transcribe all text visible in this image. \
    Reply with the transcribed text only, no commentary. \
    Reply with an empty message if the image contains no text.";

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<MessageParam>,
}

#[derive(Debug, Serialize)]
struct MessageParam {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockResponse {
    Text { text: String },
}

pub struct VisionExtractor {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl VisionExtractor {
    pub fn new(api_key: String, model: String) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("failed to create HTTP client for vision OCR")?;
        Ok(Self {
            http_client,
            api_key,
            model,
            api_base: API_BASE.to_string(),
        })
    }

    fn media_type_for(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            _ => "image/jpeg",
        }
    }

    fn build_request(&self, path: &Path, image_data: &[u8]) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![MessageParam {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64".to_string(),
                            media_type: Self::media_type_for(path).to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(image_data),
                        },
                    },
                    ContentBlock::Text {
                        text: PROMPT.to_string(),
                    },
                ],
            }],
        }
    }
}

#[async_trait]
impl TextExtractor for VisionExtractor {
    fn name(&self) -> &'static str {
        "vision"
    }

    async fn extract_text(&self, path: &Path) -> anyhow::Result<String> {
        let image_data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read image {}", path.display()))?;

        let request = self.build_request(path, &image_data);
        let response = self
            .http_client
            .post(format!("{}/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .context("vision OCR request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("vision OCR returned {}: {}", status, body);
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("failed to parse vision OCR response")?;
        let text = parsed
            .content
            .into_iter()
            .map(|block| match block {
                ContentBlockResponse::Text { text } => text,
            })
            .collect::<Vec<_>>()
            .join("\n");

        tracing::debug!(image = %path.display(), chars = text.len(), "vision recognition finished");
        Ok(text)
    }
}
