//! Hashing System - SHA-256 content digests
//!
//! Digests are computed over raw file bytes. Files are streamed through a
//! fixed buffer so arbitrarily large assets never sit in memory whole.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Length in bytes of every digest produced here
pub const DIGEST_LEN: usize = 32;

pub type ContentDigest = [u8; DIGEST_LEN];

const READ_BUFFER_SIZE: usize = 8192;

/// Compute the SHA-256 digest of bytes
pub fn sha256_digest(data: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the SHA-256 digest of everything a reader yields (streaming)
pub fn sha256_reader(mut reader: impl Read) -> io::Result<ContentDigest> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }
    Ok(hasher.finalize().into())
}

/// Compute the SHA-256 digest of a file's contents
///
/// An empty path is rejected with [`io::ErrorKind::InvalidInput`] before
/// anything is opened.
pub fn sha256_file(path: &Path) -> io::Result<ContentDigest> {
    if path.as_os_str().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "cannot hash a file with an empty path",
        ));
    }
    let file = File::open(path)?;
    sha256_reader(file)
}

pub mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}
