//! Asset-serving HTTP surface.
//!
//! `GET /memes/{token}` and `GET /thumbnails/{token}` validate the signed
//! token, resolve the asset name under the respective root, and stream the
//! file. Token validation holds no shared mutable state, so requests run
//! fully in parallel.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use memestash_core::{token, AppError};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/memes/{token}", get(get_meme))
        .route("/thumbnails/{token}", get(get_thumbnail))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn liveness() -> &'static str {
    "Memestash is running"
}

async fn get_meme(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Response, HttpAppError> {
    let asset_name = token::verify(&token, &state.secret).map_err(AppError::from)?;
    let path = state
        .store
        .resolve_original(&asset_name)
        .await
        .map_err(AppError::from)?;
    stream_file(&path).await
}

async fn get_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Response, HttpAppError> {
    let asset_name = token::verify(&token, &state.secret).map_err(AppError::from)?;
    let path = state
        .store
        .resolve_thumbnail(&asset_name)
        .await
        .map_err(AppError::from)?;
    stream_file(&path).await
}

async fn stream_file(path: &std::path::Path) -> Result<Response, HttpAppError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(AppError::from)?;
    let stream = tokio_util::io::ReaderStream::new(file);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/jpeg")
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(Body::from_stream(stream))
        .map_err(|e| HttpAppError(AppError::Internal(e.to_string())))
}
