//! Derived-asset processing: bounded thumbnails for stored originals.

mod thumbnail;

pub use thumbnail::{generate_thumbnail, THUMBNAIL_MAX_HEIGHT, THUMBNAIL_MAX_WIDTH};
