//! Archive integrity verification.
//!
//! The digest is computed while the archive streams to disk, over exactly the
//! bytes written, and compared against the published checksum before anything
//! is extracted.

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::core::UpdateError;

/// Incremental SHA-256 over a byte stream.
#[derive(Default, Clone)]
pub struct StreamingDigest {
    hasher: Sha256,
    bytes: u64,
}

impl StreamingDigest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Number of bytes hashed so far.
    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Lowercase hex digest of everything hashed.
    #[must_use]
    pub fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Checksum parsing and comparison for release archives.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Extract the digest from a checksum file body.
    ///
    /// Accepts a bare hex digest or `sha256sum` output (`<digest>  <file>`),
    /// in which case the first token is the digest. An empty body yields an
    /// empty string, which never matches a real digest.
    #[must_use]
    pub fn parse_checksum(body: &str) -> String {
        body.split_whitespace().next().unwrap_or_default().to_string()
    }

    /// Compare a computed digest with the published one, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Integrity`] naming both digests on mismatch.
    pub fn verify(archive: &str, expected: &str, actual: &str) -> Result<(), UpdateError> {
        debug!("Verifying checksum for {archive}");

        if !expected.eq_ignore_ascii_case(actual) {
            return Err(UpdateError::Integrity {
                archive: archive.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }

        info!("Checksum verification successful for {archive}");
        Ok(())
    }
}
