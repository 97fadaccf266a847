//! Shared data model for warehouse sync.
//!
//! Everything the transport layer and the sync core exchange lives here:
//! file manifests, the server's transfer decision, signed destination
//! URLs, job status, and the chunking configuration that both the
//! fingerprinter and the multipart uploader must agree on.

mod types;

pub use types::{
    ChunkingConfig, ConfigError, FileRecord, JobReport, JobStatus, RemoteDecision, SignedUrls,
};

/// Chunk size used for multipart fingerprints and multipart uploads: 50 MiB.
///
/// The remote store computes its own identifiers over parts of exactly this
/// size. Fingerprints only match the store's records when both sides chunk
/// identically, so this constant must never diverge from the server's.
pub const MULTIPART_CHUNK_SIZE: u64 = 50 * 1024 * 1024;

/// Files at or above this size are fingerprinted and uploaded in parts.
///
/// Kept equal to [`MULTIPART_CHUNK_SIZE`]; the two are separate values on
/// the server's S3 client, but they must both match what the store uses.
pub const MULTIPART_THRESHOLD: u64 = 50 * 1024 * 1024;
