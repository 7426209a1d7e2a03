//! Content fingerprinting
//!
//! The fingerprint is a SHA-256 digest of the raw file bytes, rendered as
//! lowercase hex. It is the sole deduplication key: identical bytes always
//! produce identical fingerprints, and the database enforces uniqueness on
//! the rendered value.

use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK_SIZE: usize = 64 * 1024;

/// Fingerprint an in-memory buffer.
pub fn fingerprint_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Fingerprint an async byte stream in fixed-size chunks, so arbitrarily
/// large inputs never sit in memory whole.
pub async fn fingerprint_reader<R>(mut reader: R) -> io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Fingerprint a file on disk.
pub async fn fingerprint_file(path: &Path) -> io::Result<String> {
    let file = tokio::fs::File::open(path).await?;
    fingerprint_reader(file).await
}
