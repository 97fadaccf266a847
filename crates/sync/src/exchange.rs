//! The warehouse transport seam.
//!
//! `ExchangeClient` is implemented by the application on top of its
//! GraphQL client. Using a trait keeps the orchestration logic decoupled
//! from the wire format and testable with mocks.

use std::future::Future;
use std::pin::Pin;

use wsync_protocol::{JobReport, RemoteDecision, SignedUrls};

use crate::SyncError;

/// One manifest entry as submitted to the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSubmission {
    pub relative_path: String,
    pub fingerprint: String,
    pub size: u64,
}

/// The warehouse's response to an upload request.
#[derive(Debug, Clone)]
pub struct UploadGrant {
    /// Project id, newly issued for a create or existing for an update.
    pub project_id: String,
    /// The server's create/update/delete verdict per path.
    pub decision: RemoteDecision,
}

/// Abstract connection to the warehouse.
pub trait ExchangeClient: Send + Sync {
    /// Submits the manifest (paths, fingerprints, sizes) and receives the
    /// transfer decision.
    fn request_upload<'a>(
        &'a self,
        files: &'a [FileSubmission],
    ) -> Pin<Box<dyn Future<Output = Result<UploadGrant, SyncError>> + Send + 'a>>;

    /// Requests signed destination URLs for the given paths.
    fn request_file_urls<'a>(
        &'a self,
        paths: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SignedUrls>, SyncError>> + Send + 'a>>;

    /// Tells the warehouse all transfers are done; starts server-side
    /// processing.
    fn finalize<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), SyncError>> + Send + 'a>>;

    /// Fetches the current status of the server-side processing job.
    fn check_status<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<JobReport, SyncError>> + Send + 'a>>;
}
