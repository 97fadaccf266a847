//! Project sync orchestration.
//!
//! Drives one full sync of a local project against the warehouse:
//! fingerprint the manifest, submit it, reconcile the server's decision
//! into a transfer plan, upload with bounded concurrency, finalize, and
//! poll the server-side job to completion. The GraphQL/HTTP transport
//! stays behind [`ExchangeClient`] and [`wsync_upload::FileUploader`].

mod exchange;
mod sync;
mod types;

pub use exchange::{ExchangeClient, FileSubmission, UploadGrant};
pub use sync::ProjectSync;
pub use types::{SyncEvent, SyncOptions, SyncReport, SyncStage};

use wsync_poll::PollError;

/// Errors that end a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Fingerprint(#[from] wsync_fingerprint::FingerprintError),

    #[error(transparent)]
    Plan(#[from] wsync_plan::PlanError),

    /// One or more transfers failed. Every failed path is listed with its
    /// cause; the queue drained before this was raised.
    #[error("upload failed for {failures:?}")]
    Transfer { failures: Vec<(String, String)> },

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("exchange request failed: {0}")]
    Exchange(String),

    /// The warehouse issued signed URLs for a path not in the transfer
    /// plan. Protocol mismatch, same severity as a bad decision.
    #[error("signed URLs reference unknown local path: {0}")]
    UnknownPath(String),

    #[error("sync cancelled")]
    Cancelled,
}
