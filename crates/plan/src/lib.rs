//! Sync planning: manifest production and local/remote reconciliation.
//!
//! The scanner walks a project directory into a manifest. The planner is
//! a pure function that partitions that manifest against the warehouse's
//! transfer decision; it never touches the filesystem or the network.

mod planner;
mod scanner;

pub use planner::{PlannedUpload, TransferPlan, plan};
pub use scanner::scan_project;

/// Errors produced while scanning or planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote decision named a create/update path that is not in the
    /// local manifest. This is a protocol mismatch with the warehouse and
    /// must abort the sync rather than be silently dropped.
    #[error("remote decision references unknown local path: {path}")]
    UnknownPath { path: String },
}
