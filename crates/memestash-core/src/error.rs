//! Error types module
//!
//! All failures are unified under the `AppError` enum. The variants mirror
//! the caller-visible outcomes of the system: a duplicate submission is not
//! the same thing as a broken database, and a forged token is not the same
//! thing as a missing file. The asset-serving layer relies on
//! `InvalidToken`, `PathTraversal`, and `AssetNotFound` staying distinct
//! even though HTTP collapses the first two to a uniform 403.

use sqlx::Error as SqlxError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Content with this fingerprint is already stored. Expected outcome
    /// for re-submitted images, never retried.
    #[error("duplicate content: {0}")]
    DuplicateContent(String),

    #[error("database error: {0}")]
    Database(#[source] SqlxError),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Tag derivation failed. Best-effort: callers degrade to a smaller
    /// tag set and log, never abort ingestion.
    #[error("tagging failed: {0}")]
    Tagging(String),

    /// Thumbnail derivation failed. Best-effort, retried by the
    /// regeneration and rescan paths.
    #[error("thumbnail generation failed: {0}")]
    Thumbnail(String),

    #[error("invalid token: {0}")]
    InvalidToken(#[from] crate::token::TokenError),

    #[error("path escapes asset root: {0}")]
    PathTraversal(String),

    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("unauthorized sender: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SqlxError> for AppError {
    /// A UNIQUE-constraint violation is the single source of truth for
    /// "duplicate": the insert and the check are one atomic statement, so
    /// concurrent ingestions of identical bytes cannot both win.
    fn from(err: SqlxError) -> Self {
        if let SqlxError::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return AppError::DuplicateContent(db_err.message().to_string());
            }
        }
        AppError::Database(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageUnavailable(format!("IO error: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl AppError {
    /// True for failures of best-effort derived work that must never abort
    /// the primary persisted outcome.
    pub fn is_best_effort(&self) -> bool {
        matches!(self, AppError::Tagging(_) | AppError::Thumbnail(_))
    }

    /// Plain-language message safe to send back to a chat user. Internal
    /// detail (paths, SQL) stays in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::DuplicateContent(_) => "This meme is already saved.",
            AppError::Database(_) | AppError::StorageUnavailable(_) => {
                "Something went wrong while saving. Please try again."
            }
            AppError::Unauthorized(_) => "You are not authorized to use this bot.",
            _ => "Something went wrong.",
        }
    }
}
