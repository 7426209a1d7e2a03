//! Configuration module
//!
//! Configuration is read once from the environment at process start and
//! passed into components as an immutable value. Nothing reads ambient
//! process state after startup: the allow-list and the signing secret live
//! here and only here.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_TESSERACT_PATH: &str = "tesseract";
const DEFAULT_TESSERACT_LANGS: &str = "eng+rus";
const DEFAULT_VISION_MODEL: &str = "claude-sonnet-4-20250514";

/// OCR backend selected at startup. The ingestion pipeline only sees the
/// `TextExtractor` trait and does not depend on which one is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OcrBackend {
    Tesseract,
    Vision,
    Disabled,
}

impl OcrBackend {
    fn parse(s: &str) -> Result<Self, anyhow::Error> {
        match s.to_lowercase().as_str() {
            "tesseract" => Ok(OcrBackend::Tesseract),
            "vision" => Ok(OcrBackend::Vision),
            "disabled" | "none" | "off" => Ok(OcrBackend::Disabled),
            other => Err(anyhow::anyhow!(
                "Unknown OCR backend '{}' (expected tesseract, vision, or disabled)",
                other
            )),
        }
    }
}

/// OCR capability configuration
#[derive(Clone, Debug)]
pub struct OcrConfig {
    pub backend: OcrBackend,
    pub tesseract_path: String,
    pub tesseract_languages: String,
    pub vision_api_key: Option<String>,
    pub vision_model: String,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    /// Public base URL used when constructing signed asset links.
    pub public_url: String,
    /// Server-held secret for signing asset tokens. Required: the process
    /// refuses to start without it.
    pub signing_secret: String,
    /// Root directory holding the metadata store and both asset
    /// directories. Layout: `memes.db`, `memes/`, `thumbnails/`, `tmp/`.
    pub data_dir: PathBuf,
    /// Sender identities allowed to use the bot. `None` means
    /// unrestricted, which startup logs loudly as a security-relevant
    /// default.
    pub allowed_senders: Option<HashSet<String>>,
    pub db_max_connections: u32,
    pub ocr: OcrConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` delegates here;
    /// tests supply a map instead of mutating process environment.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let server_port = match lookup("MEMESTASH_PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("Invalid MEMESTASH_PORT '{}': {}", v, e))?,
            None => DEFAULT_PORT,
        };

        let public_url = lookup("MEMESTASH_PUBLIC_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", server_port))
            .trim_end_matches('/')
            .to_string();

        let signing_secret = lookup("MEMESTASH_SIGNING_SECRET").unwrap_or_default();

        let data_dir = PathBuf::from(
            lookup("MEMESTASH_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );

        let allowed_senders = lookup("MEMESTASH_ALLOWED_SENDERS").and_then(|raw| {
            let set: HashSet<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if set.is_empty() {
                None
            } else {
                Some(set)
            }
        });

        let db_max_connections = match lookup("MEMESTASH_DB_MAX_CONNECTIONS") {
            Some(v) => v.parse::<u32>().map_err(|e| {
                anyhow::anyhow!("Invalid MEMESTASH_DB_MAX_CONNECTIONS '{}': {}", v, e)
            })?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        let backend = match lookup("MEMESTASH_OCR_BACKEND") {
            Some(v) => OcrBackend::parse(&v)?,
            None => OcrBackend::Tesseract,
        };

        let ocr = OcrConfig {
            backend,
            tesseract_path: lookup("MEMESTASH_TESSERACT_PATH")
                .unwrap_or_else(|| DEFAULT_TESSERACT_PATH.to_string()),
            tesseract_languages: lookup("MEMESTASH_TESSERACT_LANGS")
                .unwrap_or_else(|| DEFAULT_TESSERACT_LANGS.to_string()),
            vision_api_key: lookup("MEMESTASH_VISION_API_KEY"),
            vision_model: lookup("MEMESTASH_VISION_MODEL")
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
        };

        Ok(Config {
            server_port,
            public_url,
            signing_secret,
            data_dir,
            allowed_senders,
            db_max_connections,
            ocr,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.signing_secret.trim().is_empty() {
            anyhow::bail!(
                "MEMESTASH_SIGNING_SECRET is required; refusing to start without a signing secret"
            );
        }
        if self.ocr.backend == OcrBackend::Vision && self.ocr.vision_api_key.is_none() {
            anyhow::bail!("MEMESTASH_VISION_API_KEY is required when MEMESTASH_OCR_BACKEND=vision");
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("memes.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(map: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn minimal_config_with_secret_validates() {
        let lookup = lookup_from(HashMap::from([("MEMESTASH_SIGNING_SECRET", "s3cret")]));
        let config = Config::from_lookup(&lookup).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.public_url, "http://localhost:8080");
        assert!(config.allowed_senders.is_none());
        assert_eq!(config.ocr.backend, OcrBackend::Tesseract);
    }

    #[test]
    fn missing_secret_fails_validation() {
        let lookup = lookup_from(HashMap::new());
        let config = Config::from_lookup(&lookup).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn allowed_senders_parsed_and_trimmed() {
        let lookup = lookup_from(HashMap::from([
            ("MEMESTASH_SIGNING_SECRET", "s"),
            ("MEMESTASH_ALLOWED_SENDERS", " 12345 ,67890,, "),
        ]));
        let config = Config::from_lookup(&lookup).unwrap();
        let senders = config.allowed_senders.unwrap();
        assert_eq!(senders.len(), 2);
        assert!(senders.contains("12345"));
        assert!(senders.contains("67890"));
    }

    #[test]
    fn vision_backend_requires_api_key() {
        let lookup = lookup_from(HashMap::from([
            ("MEMESTASH_SIGNING_SECRET", "s"),
            ("MEMESTASH_OCR_BACKEND", "vision"),
        ]));
        let config = Config::from_lookup(&lookup).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn public_url_trailing_slash_stripped() {
        let lookup = lookup_from(HashMap::from([
            ("MEMESTASH_SIGNING_SECRET", "s"),
            ("MEMESTASH_PUBLIC_URL", "https://memes.example.com/"),
        ]));
        let config = Config::from_lookup(&lookup).unwrap();
        assert_eq!(config.public_url, "https://memes.example.com");
    }

    #[test]
    fn unknown_ocr_backend_rejected() {
        let lookup = lookup_from(HashMap::from([
            ("MEMESTASH_SIGNING_SECRET", "s"),
            ("MEMESTASH_OCR_BACKEND", "easyocr"),
        ]));
        assert!(Config::from_lookup(&lookup).is_err());
    }
}
