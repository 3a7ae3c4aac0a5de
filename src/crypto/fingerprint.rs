//! Document fingerprinting.
//!
//! A fingerprint is the SHA-256 digest of the raw document bytes. Identical
//! bytes always yield an identical fingerprint; there is no canonicalization
//! step. Three entry points cover the callers we have:
//!
//! - [`fingerprint_bytes`] for a fully-buffered document
//! - [`FingerprintHasher`] for incremental hashing of chunked input
//! - [`fingerprint_file`] for a document held on disk

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::domain::Fingerprint;
use crate::infra::Result;

/// Read size for the file path. Documents are typically a few MB; 64 KiB
/// chunks keep memory flat without measurable overhead.
const FILE_CHUNK_SIZE: usize = 64 * 1024;

/// Compute the fingerprint of a fully-buffered document.
pub fn fingerprint_bytes(data: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Fingerprint::from_bytes(hasher.finalize().into())
}

/// Incremental fingerprint computation for callers that hold the document
/// in chunks (streamed uploads, browser-side hashing mirrors).
#[derive(Debug, Default)]
pub struct FingerprintHasher {
    inner: Sha256,
}

impl FingerprintHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    pub fn finalize(self) -> Fingerprint {
        Fingerprint::from_bytes(self.inner.finalize().into())
    }
}

/// Compute the fingerprint of a document stored on disk.
///
/// Reads in chunks; a read error at any point surfaces as `RegistryError::Io`
/// and no partial hash is ever returned.
pub async fn fingerprint_file(path: impl AsRef<Path>) -> Result<Fingerprint> {
    let mut file = tokio::fs::File::open(path.as_ref()).await?;
    let mut hasher = FingerprintHasher::new();
    let mut buf = vec![0u8; FILE_CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize())
}
