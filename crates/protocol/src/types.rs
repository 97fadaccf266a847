use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One local file in the sync manifest.
///
/// `relative_path` is the file's identity within a sync run: unique,
/// relative to the project root, `/`-separated on every platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub absolute_path: PathBuf,
    pub relative_path: String,
    pub size: u64,
}

/// The server's verdict on each submitted path.
///
/// Produced by the warehouse after it compares submitted fingerprints to
/// its records. The sync core never derives this locally; it only
/// partitions the manifest according to it. Paths in `delete` are
/// remote-only files slated for removal and need not exist locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDecision {
    #[serde(default)]
    pub create: Vec<String>,
    #[serde(default)]
    pub update: Vec<String>,
    #[serde(default)]
    pub delete: Vec<String>,
}

/// Signed destination URLs for one file.
///
/// One URL means a single-shot upload; more than one means a multipart
/// upload with one URL per chunk, in chunk order. The URLs are opaque to
/// the sync core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrls {
    pub relative_path: String,
    pub urls: Vec<String>,
}

/// Server-side processing state of a finalized upload job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// No poll has happened yet. Local-only, never server-reported.
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "failed")]
    Failed,
}

impl JobStatus {
    /// Returns `true` for states from which no further transition occurs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

/// A job status observation, with the server's error detail when failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl JobReport {
    /// A report for a status with no error detail.
    pub fn status(status: JobStatus) -> Self {
        Self {
            status,
            errors: Vec::new(),
        }
    }
}

/// Invalid chunking configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,
}

/// Chunk size and multipart threshold, threaded together through the
/// whole pipeline.
///
/// The same value drives both the fingerprint scheme selection and the
/// upload chunking; if the two ever disagree, local and remote
/// fingerprints silently diverge and every sync re-uploads everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingConfig {
    pub chunk_size: u64,
    pub multipart_threshold: u64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::MULTIPART_CHUNK_SIZE,
            multipart_threshold: crate::MULTIPART_THRESHOLD,
        }
    }
}

impl ChunkingConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(())
    }

    /// Number of parts a file of `size` bytes splits into.
    ///
    /// Zero-byte files still occupy one part.
    pub fn part_count(&self, size: u64) -> u64 {
        if size == 0 {
            1
        } else {
            size.div_ceil(self.chunk_size)
        }
    }

    /// Whether a file of `size` bytes takes the multipart path.
    ///
    /// The boundary is inclusive: a file exactly at the threshold is
    /// multipart.
    pub fn is_multipart(&self, size: u64) -> bool {
        size >= self.multipart_threshold
    }
}
