//! Meme metadata repository.
//!
//! One table, keyed by content hash. Uniqueness of the hash is enforced by
//! a UNIQUE index so that the duplicate check and the write are a single
//! atomic statement; concurrent ingestions of identical bytes race on the
//! constraint, never on an application-level existence read.

use memestash_core::tags::{self, TagSet};
use memestash_core::{AppError, MediaRecord};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

const POOL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Open the on-disk database, creating the file and applying schema
/// migration.
pub async fn open_file(path: &Path, max_connections: u32) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(POOL_ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(AppError::from)?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Open a private in-memory database with the schema applied. Single
/// connection, since every in-memory connection is its own database.
pub async fn open_in_memory() -> Result<SqlitePool, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().in_memory(true))
        .await
        .map_err(AppError::from)?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Create the table and migrate legacy schemas to the hash-addressed one.
///
/// Early revisions keyed rows on the transport's `file_unique_id`; that
/// column is renamed to `content_hash` in place. The UNIQUE index is what
/// makes `insert` atomic with respect to the duplicate check.
async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS memes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_hash TEXT NOT NULL,
            file_path TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT ''
        )",
    )
    .execute(pool)
    .await?;

    let columns: HashSet<String> = sqlx::query("PRAGMA table_info(memes)")
        .fetch_all(pool)
        .await?
        .iter()
        .map(|row| row.get::<String, _>("name"))
        .collect();

    if columns.contains("file_unique_id") {
        tracing::info!("migrating memes table: file_unique_id -> content_hash");
        sqlx::query("ALTER TABLE memes RENAME COLUMN file_unique_id TO content_hash")
            .execute(pool)
            .await?;
    } else if !columns.contains("content_hash") {
        sqlx::query("ALTER TABLE memes ADD COLUMN content_hash TEXT")
            .execute(pool)
            .await?;
    }

    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_content_hash ON memes (content_hash)")
        .execute(pool)
        .await?;

    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct MemeRow {
    id: i64,
    content_hash: String,
    file_path: String,
    tags: String,
}

impl MemeRow {
    fn into_record(self) -> MediaRecord {
        MediaRecord {
            id: self.id,
            content_hash: self.content_hash,
            asset_name: self.file_path,
            tags: tags::parse(&self.tags),
        }
    }
}

/// Repository for meme metadata.
#[derive(Clone)]
pub struct MemeRepository {
    pool: SqlitePool,
}

impl MemeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new record. Fails with `AppError::DuplicateContent` when
    /// the fingerprint is already stored; the conflict comes from the
    /// UNIQUE index, not a prior read.
    pub async fn insert(
        &self,
        content_hash: &str,
        asset_name: &str,
        tag_set: &TagSet,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO memes (content_hash, file_path, tags) VALUES (?1, ?2, ?3)",
        )
        .bind(content_hash)
        .bind(asset_name)
        .bind(tags::join(tag_set))
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// All records in insertion (id) order.
    pub async fn list_all(&self) -> Result<Vec<MediaRecord>, AppError> {
        let rows: Vec<MemeRow> =
            sqlx::query_as("SELECT id, content_hash, file_path, tags FROM memes ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(MemeRow::into_record).collect())
    }

    /// Every stored fingerprint, for bulk reconciliation scans.
    pub async fn all_fingerprints(&self) -> Result<HashSet<String>, AppError> {
        let rows = sqlx::query("SELECT content_hash FROM memes WHERE content_hash IS NOT NULL")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| row.get::<String, _>("content_hash"))
            .collect())
    }

    /// Wholesale tag overwrite for one record. Idempotent; a miss is not
    /// an error.
    pub async fn replace_tags(&self, content_hash: &str, tag_set: &TagSet) -> Result<(), AppError> {
        sqlx::query("UPDATE memes SET tags = ?1 WHERE content_hash = ?2")
            .bind(tags::join(tag_set))
            .bind(content_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete every record. Irreversible.
    pub async fn clear(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM memes").execute(&self.pool).await?;
        Ok(())
    }
}
