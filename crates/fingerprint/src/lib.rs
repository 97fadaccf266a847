//! Content fingerprints for change detection.
//!
//! The warehouse stores a multipart-aware identifier for every object:
//! small files are hashed whole, large files are hashed per fixed-size
//! chunk and the chunk digests are hashed again. A locally computed
//! fingerprint that matches the stored one means the file is unchanged
//! and is never re-uploaded.

mod chunked;
mod hash;
mod manifest;

pub use chunked::{ChunkReader, FileChunk};
pub use hash::{Fingerprint, fingerprint_file};
pub use manifest::fingerprint_manifest;

/// Errors produced while fingerprinting.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] wsync_protocol::ConfigError),

    #[error("hash task failed: {0}")]
    TaskJoin(String),
}
