//! Core types shared across the Memestash workspace: configuration, the
//! error taxonomy, the `MediaRecord` domain model, content fingerprinting,
//! tag normalization, and signed asset tokens.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod models;
pub mod tags;
pub mod token;

pub use config::{Config, OcrBackend, OcrConfig};
pub use error::AppError;
pub use models::{MediaRecord, MediaResult};
pub use tags::{TagSet, TagSource};
