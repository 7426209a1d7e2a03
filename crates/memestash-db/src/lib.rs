//! Data access layer: the meme metadata repository over SQLite.

mod repository;

pub use repository::{open_file, open_in_memory, MemeRepository};
