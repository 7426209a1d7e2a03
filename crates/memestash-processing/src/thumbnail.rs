//! Thumbnail generation.
//!
//! Thumbnails are bounded to 320x240 preserving aspect ratio and encoded
//! as JPEG whatever the source format. Generation is best-effort
//! everywhere it is called: a failure is logged by the caller and never
//! rolls back ingestion.

use memestash_core::AppError;
use std::path::{Path, PathBuf};

pub const THUMBNAIL_MAX_WIDTH: u32 = 320;
pub const THUMBNAIL_MAX_HEIGHT: u32 = 240;

/// Decode `source`, downscale within the bounds, write JPEG to `dest`.
/// Decode and encode are CPU-bound, so the whole job runs off the async
/// runtime's worker threads.
pub async fn generate_thumbnail(source: &Path, dest: &Path) -> Result<(), AppError> {
    let source = source.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || generate_blocking(&source, &dest))
        .await
        .map_err(|e| AppError::Thumbnail(format!("thumbnail task panicked: {}", e)))?
}

fn generate_blocking(source: &PathBuf, dest: &PathBuf) -> Result<(), AppError> {
    let img = image::open(source)
        .map_err(|e| AppError::Thumbnail(format!("failed to decode {}: {}", source.display(), e)))?;
    let thumb = img.thumbnail(THUMBNAIL_MAX_WIDTH, THUMBNAIL_MAX_HEIGHT);
    // JPEG has no alpha channel.
    thumb
        .to_rgb8()
        .save_with_format(dest, image::ImageFormat::Jpeg)
        .map_err(|e| AppError::Thumbnail(format!("failed to encode {}: {}", dest.display(), e)))?;
    tracing::debug!(source = %source.display(), dest = %dest.display(), "thumbnail generated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};
    use tempfile::tempdir;

    fn write_test_png(path: &Path, width: u32, height: u32) {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 60, 60, 255]));
        img.save_with_format(path, image::ImageFormat::Png).unwrap();
    }

    #[tokio::test]
    async fn large_image_bounded_to_limits() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("big.png");
        let dst = dir.path().join("thumb.jpg");
        write_test_png(&src, 1280, 960);

        generate_thumbnail(&src, &dst).await.unwrap();

        let thumb = image::open(&dst).unwrap();
        let (w, h) = thumb.dimensions();
        assert!(w <= THUMBNAIL_MAX_WIDTH);
        assert!(h <= THUMBNAIL_MAX_HEIGHT);
    }

    #[tokio::test]
    async fn small_image_not_upscaled() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("small.png");
        let dst = dir.path().join("thumb.jpg");
        write_test_png(&src, 100, 80);

        generate_thumbnail(&src, &dst).await.unwrap();

        let (w, h) = image::open(&dst).unwrap().dimensions();
        assert_eq!((w, h), (100, 80));
    }

    #[tokio::test]
    async fn non_image_input_fails_with_thumbnail_error() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("garbage.bin");
        let dst = dir.path().join("thumb.jpg");
        std::fs::write(&src, b"definitely not an image").unwrap();

        let err = generate_thumbnail(&src, &dst).await.unwrap_err();
        assert!(matches!(err, AppError::Thumbnail(_)));
        assert!(!dst.exists());
    }
}
