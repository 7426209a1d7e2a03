//! Ingestion pipeline and maintenance passes.
//!
//! One submission walks: spool -> fingerprint -> tag -> atomic insert ->
//! rename-commit -> thumbnail. The insert is the commit point; a duplicate
//! conflict there is the expected outcome for re-submitted content and the
//! spooled bytes are discarded. The original file is moved into place only
//! after the insert succeeds, and thumbnailing after that is best-effort.

use memestash_core::fingerprint::fingerprint_file;
use memestash_core::tags::{self, TagSet, TagSource};
use memestash_core::{AppError, MediaRecord};
use memestash_db::MemeRepository;
use memestash_ocr::TextExtractor;
use memestash_processing::generate_thumbnail;
use memestash_storage::AssetStore;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Terminal outcome of one submission.
#[derive(Debug)]
pub enum IngestOutcome {
    Stored {
        id: i64,
        asset_name: String,
        tags: TagSet,
    },
    /// Content with the same fingerprint is already stored.
    Duplicate,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RescanReport {
    pub added: usize,
    pub already_known: usize,
    pub failed: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RetagReport {
    pub retagged: usize,
    pub skipped_missing: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ThumbnailReport {
    pub generated: usize,
    pub skipped_existing: usize,
    pub missing_original: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct IngestionPipeline {
    repo: MemeRepository,
    store: AssetStore,
    extractor: Arc<dyn TextExtractor>,
}

impl IngestionPipeline {
    pub fn new(repo: MemeRepository, store: AssetStore, extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            repo,
            store,
            extractor,
        }
    }

    /// Ingest one submitted image. `caption` contributes tags without the
    /// stop-word filter; OCR contributes with it, and its failure degrades
    /// to caption-only tags.
    pub async fn ingest(
        &self,
        bytes: &[u8],
        caption: Option<&str>,
    ) -> Result<IngestOutcome, AppError> {
        let spooled = self.store.spool(bytes).await.map_err(AppError::from)?;
        let content_hash = fingerprint_file(spooled.path()).await?;

        let mut tag_set = self.ocr_tags(spooled.path()).await;
        if let Some(caption) = caption {
            tag_set.extend(tags::normalize(caption, TagSource::Caption));
        }

        // Unpredictable per-upload name; never derived from user input.
        let asset_name = format!("{}.jpg", Uuid::new_v4());

        let id = match self.repo.insert(&content_hash, &asset_name, &tag_set).await {
            Ok(id) => id,
            Err(AppError::DuplicateContent(_)) => {
                tracing::info!(content_hash = %content_hash, "duplicate submission discarded");
                return Ok(IngestOutcome::Duplicate);
            }
            Err(e) => return Err(e),
        };

        let original = self
            .store
            .commit(spooled, &asset_name)
            .await
            .map_err(AppError::from)?;
        self.thumbnail_best_effort(&original, &asset_name).await;

        tracing::info!(id, asset = %asset_name, tag_count = tag_set.len(), "meme ingested");
        Ok(IngestOutcome::Stored {
            id,
            asset_name,
            tags: tag_set,
        })
    }

    /// Reconciliation pass: insert records for files present on disk but
    /// absent from the store. Idempotent; safe against concurrent live
    /// ingestion because a losing insert surfaces as a duplicate and is
    /// swallowed here.
    pub async fn rescan(&self) -> Result<RescanReport, AppError> {
        let known = self.repo.all_fingerprints().await?;
        let names = self.store.list_originals().await.map_err(AppError::from)?;
        tracing::info!(on_disk = names.len(), in_store = known.len(), "rescan started");

        let mut report = RescanReport::default();
        for name in names {
            let path = match self.store.original_path(&name) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(asset = %name, error = %e, "skipping unresolvable file");
                    report.failed += 1;
                    continue;
                }
            };
            let content_hash = match fingerprint_file(&path).await {
                Ok(h) => h,
                Err(e) => {
                    tracing::warn!(asset = %name, error = %e, "failed to fingerprint during rescan");
                    report.failed += 1;
                    continue;
                }
            };
            if known.contains(&content_hash) {
                report.already_known += 1;
                continue;
            }

            let tag_set = self.ocr_tags(&path).await;
            match self.repo.insert(&content_hash, &name, &tag_set).await {
                Ok(id) => {
                    tracing::info!(id, asset = %name, "orphan adopted into store");
                    report.added += 1;
                    if !self.store.thumbnail_exists(&name).await {
                        self.thumbnail_best_effort(&path, &name).await;
                    }
                }
                Err(AppError::DuplicateContent(_)) => {
                    // Lost a race against live ingestion; already present.
                    report.already_known += 1;
                }
                Err(e) => {
                    tracing::error!(asset = %name, error = %e, "failed to insert during rescan");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Re-derive tags from OCR for every record whose original is present
    /// and overwrite the stored set wholesale. Records with a missing
    /// asset file are skipped, not failed.
    pub async fn retag_all(&self) -> Result<RetagReport, AppError> {
        let mut report = RetagReport::default();
        for record in self.repo.list_all().await? {
            if !self.store.original_exists(&record.asset_name).await {
                tracing::warn!(asset = %record.asset_name, "original missing, skipping retag");
                report.skipped_missing += 1;
                continue;
            }
            let path = self
                .store
                .original_path(&record.asset_name)
                .map_err(AppError::from)?;
            let tag_set = self.ocr_tags(&path).await;
            self.repo.replace_tags(&record.content_hash, &tag_set).await?;
            report.retagged += 1;
        }
        Ok(report)
    }

    /// Create thumbnails for records that lack one. Existing thumbnails
    /// are left alone; missing originals are reported, not failed.
    pub async fn regenerate_thumbnails(&self) -> Result<ThumbnailReport, AppError> {
        let mut report = ThumbnailReport::default();
        for record in self.repo.list_all().await? {
            if !self.store.original_exists(&record.asset_name).await {
                tracing::warn!(asset = %record.asset_name, "original missing, cannot thumbnail");
                report.missing_original += 1;
                continue;
            }
            if self.store.thumbnail_exists(&record.asset_name).await {
                report.skipped_existing += 1;
                continue;
            }
            let original = self
                .store
                .original_path(&record.asset_name)
                .map_err(AppError::from)?;
            match self.try_thumbnail(&original, &record.asset_name).await {
                Ok(()) => report.generated += 1,
                Err(e) => {
                    tracing::warn!(asset = %record.asset_name, error = %e, "thumbnail regeneration failed");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    pub fn repository(&self) -> &MemeRepository {
        &self.repo
    }

    async fn ocr_tags(&self, path: &Path) -> TagSet {
        match self.extractor.extract_text(path).await {
            Ok(text) => tags::normalize(&text, TagSource::Ocr),
            Err(e) => {
                tracing::warn!(
                    backend = self.extractor.name(),
                    error = %e,
                    "text extraction failed, continuing without OCR tags"
                );
                TagSet::new()
            }
        }
    }

    async fn try_thumbnail(&self, original: &Path, asset_name: &str) -> Result<(), AppError> {
        let dest = self
            .store
            .thumbnail_path(asset_name)
            .map_err(AppError::from)?;
        generate_thumbnail(original, &dest).await
    }

    async fn thumbnail_best_effort(&self, original: &Path, asset_name: &str) {
        if let Err(e) = self.try_thumbnail(original, asset_name).await {
            tracing::warn!(asset = %asset_name, error = %e, "thumbnail generation failed");
        }
    }
}

/// Convenience for callers formatting the dump command.
pub fn format_dump(records: &[MediaRecord]) -> String {
    let mut out = String::from("Database content:\n");
    for record in records {
        out.push_str(&format!(
            "ID: {}, Path: {}, Tags: {}\n",
            record.id,
            record.asset_name,
            record.tags_joined()
        ));
    }
    out
}
