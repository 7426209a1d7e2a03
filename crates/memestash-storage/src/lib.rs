//! Local filesystem asset store.
//!
//! Layout under the data directory: `memes/` (originals), `thumbnails/`
//! (derived), `tmp/` (ingestion spool). The spool lives on the same
//! filesystem as the originals so the commit is a plain atomic rename; a
//! concurrent reader never sees a partially written asset.

mod store;

pub use store::{AssetStore, SpooledFile, StorageError, StorageResult};
