use std::time::Duration;

use uuid::Uuid;
use wsync_protocol::{ChunkingConfig, JobReport};

/// Tunables for one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Chunk size and multipart threshold, shared between fingerprinting
    /// and upload chunking.
    pub chunking: ChunkingConfig,
    /// Upper bound on simultaneously in-flight file transfers.
    pub concurrency: usize,
    /// Delay between job status polls.
    pub poll_interval: Duration,
    /// Total polling budget after finalize.
    pub max_wait: Duration,
    /// When `false`, finalize and return without polling.
    pub wait: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            concurrency: wsync_upload::DEFAULT_CONCURRENT_UPLOADS,
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(40 * 60),
            wait: true,
        }
    }
}

/// Pipeline stage markers for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Fingerprinting,
    Requesting,
    Uploading,
    Finalizing,
    Polling,
    Complete,
}

/// Progress notifications emitted during a sync run. Advisory only.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Stage {
        run_id: Uuid,
        stage: SyncStage,
    },
    FileStarted {
        relative_path: String,
    },
    FileSucceeded {
        relative_path: String,
    },
    FileFailed {
        relative_path: String,
        error: String,
    },
}

/// Summary of a completed sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub project_id: String,
    /// Files transferred (new or changed).
    pub uploaded: usize,
    /// Files skipped as unchanged.
    pub ignored: usize,
    /// Remote-only files the warehouse will remove.
    pub deleted: usize,
    /// Final job report, when polling was requested and something was
    /// transferred. `None` for no-op runs and `wait = false`.
    pub job: Option<JobReport>,
}
