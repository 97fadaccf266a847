use std::path::PathBuf;

use crate::TransferError;

/// One file transfer, merged from a plan entry and its signed URLs.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub absolute_path: PathBuf,
    pub relative_path: String,
    pub size: u64,
    /// `true` when replacing a file the warehouse already holds.
    pub is_update: bool,
    /// One URL for a single-shot upload; one per chunk for multipart.
    pub destinations: Vec<String>,
}

/// Progress notifications emitted as the queue works.
///
/// Purely advisory: the queue's behavior does not change whether anyone
/// listens, and events may be dropped under backpressure.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    TaskStarted {
        relative_path: String,
    },
    TaskSucceeded {
        relative_path: String,
    },
    TaskFailed {
        relative_path: String,
        error: String,
    },
}

/// A transfer that failed, with its cause.
#[derive(Debug)]
pub struct FailedUpload {
    pub relative_path: String,
    pub error: TransferError,
}

/// Outcome of a queue run. Every submitted task appears in exactly one
/// of the three lists; nothing is silently dropped.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedUpload>,
    /// Tasks that never started because the run was cancelled.
    pub cancelled: Vec<String>,
}

impl UploadReport {
    /// `true` when every submitted task completed successfully.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }

    /// Total number of tasks accounted for.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.cancelled.len()
    }
}
