use memestash_core::AppError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("asset name is invalid: {0}")]
    InvalidName(String),

    #[error("path escapes asset root: {0}")]
    Traversal(String),

    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Traversal(name) | StorageError::InvalidName(name) => {
                AppError::PathTraversal(name)
            }
            StorageError::NotFound(name) => AppError::AssetNotFound(name),
            StorageError::Io(e) => AppError::StorageUnavailable(e.to_string()),
        }
    }
}

/// A temporary file in the spool, removed on drop unless committed.
///
/// Every ingestion exit path cleans up: success moves the file out (rename
/// marks it committed), duplicate and error paths let the guard delete it.
pub struct SpooledFile {
    path: PathBuf,
    committed: bool,
}

impl SpooledFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SpooledFile {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "failed to remove spooled file");
                }
            }
        }
    }
}

/// Local filesystem asset store for originals and thumbnails.
#[derive(Clone)]
pub struct AssetStore {
    originals_dir: PathBuf,
    thumbnails_dir: PathBuf,
    spool_dir: PathBuf,
}

impl AssetStore {
    /// Create the store rooted at `data_dir`, creating all three
    /// directories.
    pub async fn new(data_dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let data_dir = data_dir.into();
        let store = AssetStore {
            originals_dir: data_dir.join("memes"),
            thumbnails_dir: data_dir.join("thumbnails"),
            spool_dir: data_dir.join("tmp"),
        };
        for dir in [&store.originals_dir, &store.thumbnails_dir, &store.spool_dir] {
            fs::create_dir_all(dir).await?;
        }
        Ok(store)
    }

    /// Reject names that could address anything outside a single flat
    /// asset directory. Asset names are generated UUIDs, so anything with
    /// separators or dot-prefixes is hostile input.
    fn validate_name(name: &str) -> StorageResult<()> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.starts_with('.')
            || name.contains('\0')
        {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    fn checked_join(root: &Path, name: &str) -> StorageResult<PathBuf> {
        Self::validate_name(name)?;
        let path = root.join(name);
        // Defense against names the component check misses on exotic
        // platforms: the joined path must stay directly under the root.
        if path.parent() != Some(root) {
            return Err(StorageError::Traversal(name.to_string()));
        }
        Ok(path)
    }

    /// Write incoming bytes to a fresh spool file.
    pub async fn spool(&self, data: &[u8]) -> StorageResult<SpooledFile> {
        let path = self.spool_dir.join(format!("{}.part", Uuid::new_v4()));
        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        tracing::debug!(path = %path.display(), size_bytes = data.len(), "spooled upload");
        Ok(SpooledFile {
            path,
            committed: false,
        })
    }

    /// Atomically move a spooled file into the originals directory under
    /// `asset_name`. Called strictly after the metadata insert succeeds.
    pub async fn commit(&self, mut spooled: SpooledFile, asset_name: &str) -> StorageResult<PathBuf> {
        let dest = Self::checked_join(&self.originals_dir, asset_name)?;
        fs::rename(&spooled.path, &dest).await?;
        spooled.committed = true;
        tracing::info!(asset = %asset_name, "committed original asset");
        Ok(dest)
    }

    /// Unchecked-existence path of an original; the name is still
    /// validated. For writes and existence probes.
    pub fn original_path(&self, asset_name: &str) -> StorageResult<PathBuf> {
        Self::checked_join(&self.originals_dir, asset_name)
    }

    /// Unchecked-existence path of a thumbnail.
    pub fn thumbnail_path(&self, asset_name: &str) -> StorageResult<PathBuf> {
        Self::checked_join(&self.thumbnails_dir, asset_name)
    }

    /// Resolve an original for serving: traversal-checked and required to
    /// be an existing regular file. The two failure kinds stay distinct.
    pub async fn resolve_original(&self, asset_name: &str) -> StorageResult<PathBuf> {
        Self::resolve_existing(&self.originals_dir, asset_name).await
    }

    /// Resolve a thumbnail for serving.
    pub async fn resolve_thumbnail(&self, asset_name: &str) -> StorageResult<PathBuf> {
        Self::resolve_existing(&self.thumbnails_dir, asset_name).await
    }

    async fn resolve_existing(root: &Path, asset_name: &str) -> StorageResult<PathBuf> {
        let path = Self::checked_join(root, asset_name)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(asset_name.to_string()));
            }
            Err(e) => return Err(StorageError::Io(e)),
        };
        if !meta.is_file() {
            return Err(StorageError::NotFound(asset_name.to_string()));
        }
        // Belt and braces: the canonical path must stay under the root
        // even if a component was a symlink.
        let canonical = fs::canonicalize(&path).await?;
        let root_canonical = fs::canonicalize(root).await?;
        if !canonical.starts_with(&root_canonical) {
            return Err(StorageError::Traversal(asset_name.to_string()));
        }
        Ok(canonical)
    }

    pub async fn original_exists(&self, asset_name: &str) -> bool {
        match self.original_path(asset_name) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    pub async fn thumbnail_exists(&self, asset_name: &str) -> bool {
        match self.thumbnail_path(asset_name) {
            Ok(path) => fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// File names currently present in the originals directory, for the
    /// reconciliation scan. Subdirectories and dotfiles are ignored.
    pub async fn list_originals(&self) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.originals_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn store() -> (tempfile::TempDir, AssetStore) {
        let dir = tempdir().unwrap();
        let store = AssetStore::new(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn spool_commit_resolve_round_trip() {
        let (_dir, store) = store().await;

        let spooled = store.spool(b"image bytes").await.unwrap();
        let spool_path = spooled.path().to_path_buf();
        store.commit(spooled, "abc.jpg").await.unwrap();

        assert!(!fs::try_exists(&spool_path).await.unwrap());
        let resolved = store.resolve_original("abc.jpg").await.unwrap();
        assert_eq!(fs::read(&resolved).await.unwrap(), b"image bytes");
    }

    #[tokio::test]
    async fn uncommitted_spool_is_cleaned_on_drop() {
        let (_dir, store) = store().await;

        let path = {
            let spooled = store.spool(b"doomed").await.unwrap();
            spooled.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn traversal_names_rejected_distinctly_from_missing() {
        let (_dir, store) = store().await;

        for hostile in ["../escape.jpg", "a/b.jpg", "..", ".hidden", ""] {
            let err = store.resolve_original(hostile).await.unwrap_err();
            assert!(
                matches!(err, StorageError::InvalidName(_) | StorageError::Traversal(_)),
                "{:?} not classified as traversal",
                hostile
            );
        }

        let err = store.resolve_original("missing.jpg").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn resolve_requires_regular_file() {
        let (dir, store) = store().await;
        fs::create_dir(dir.path().join("memes").join("subdir"))
            .await
            .unwrap();

        // Directory names with separators never get here, but a plain
        // directory name must still fail as missing.
        let err = store.resolve_original("subdir").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_originals_skips_dirs_and_dotfiles() {
        let (dir, store) = store().await;
        let memes = dir.path().join("memes");
        fs::write(memes.join("a.jpg"), b"a").await.unwrap();
        fs::write(memes.join("b.jpg"), b"b").await.unwrap();
        fs::write(memes.join(".DS_Store"), b"junk").await.unwrap();
        fs::create_dir(memes.join("nested")).await.unwrap();

        let names = store.list_originals().await.unwrap();
        assert_eq!(names, vec!["a.jpg".to_string(), "b.jpg".to_string()]);
    }

    #[tokio::test]
    async fn storage_error_maps_to_app_error_kinds() {
        let traversal: AppError = StorageError::Traversal("x".into()).into();
        assert!(matches!(traversal, AppError::PathTraversal(_)));
        let missing: AppError = StorageError::NotFound("x".into()).into();
        assert!(matches!(missing, AppError::AssetNotFound(_)));
    }
}
