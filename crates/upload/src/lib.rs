//! Upload execution: a bounded-concurrency queue over an abstract
//! transport.
//!
//! The queue knows nothing about HTTP. It pulls tasks from a shared
//! queue with a fixed number of workers, invokes a caller-supplied
//! [`FileUploader`] per task, isolates failures, and always drains to a
//! full per-task report. [`ChunkedUploader`] is the standard uploader:
//! it dispatches each task to a single-shot or multipart transfer based
//! on how many signed URLs the warehouse issued.

mod queue;
mod task;
mod uploader;

pub use queue::UploadQueue;
pub use task::{FailedUpload, QueueEvent, UploadReport, UploadTask};
pub use uploader::{ChunkedUploader, FileUploader, PartTransport};

/// Default number of simultaneously in-flight file transfers.
pub const DEFAULT_CONCURRENT_UPLOADS: usize = 4;

/// Errors produced during a single file transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("chunking failed: {0}")]
    Chunking(#[from] wsync_fingerprint::FingerprintError),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("part {index} failed: {reason}")]
    Part { index: usize, reason: String },

    #[error("destination count {actual} does not match expected part count {expected}")]
    PartCountMismatch { expected: usize, actual: usize },

    #[error("file size changed since enumeration: recorded {expected} bytes, found {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("no destination URLs for task")]
    NoDestinations,

    #[error("upload task panicked: {0}")]
    Panicked(String),
}
