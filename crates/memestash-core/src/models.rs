//! Domain models.

use crate::tags::{self, TagSet};
use serde::Serialize;

/// The canonical stored entity: one row per unique content fingerprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaRecord {
    /// Surrogate key, assigned at insertion, immutable.
    pub id: i64,
    /// SHA-256 of the raw bytes, hex-rendered. Unique.
    pub content_hash: String,
    /// Opaque file name locating the original and its thumbnail under the
    /// asset directories. Generated per upload, never user-controlled.
    pub asset_name: String,
    pub tags: TagSet,
}

impl MediaRecord {
    /// Subset match: every query tag must be present. An empty query
    /// matches everything.
    pub fn matches(&self, query: &TagSet) -> bool {
        query.is_subset(&self.tags)
    }

    pub fn tags_joined(&self) -> String {
        tags::join(&self.tags)
    }
}

/// Outbound search result descriptor handed to the reply sink: pre-signed
/// links, nothing internal.
#[derive(Clone, Debug, Serialize)]
pub struct MediaResult {
    pub id: i64,
    pub photo_url: String,
    pub thumbnail_url: String,
}
