//! Pure reconciliation of a local manifest against the warehouse's
//! transfer decision.

use std::collections::HashSet;

use wsync_protocol::{FileRecord, RemoteDecision};

use crate::PlanError;

/// One file the plan says to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    pub record: FileRecord,
    /// `true` when the warehouse already holds an older version.
    pub is_update: bool,
}

/// The minimal set of transfers that reconciles local and remote.
///
/// Every manifest path lands in exactly one of `to_upload` or `to_ignore`.
/// `to_delete` is the warehouse's list of remote-only files slated for
/// removal, passed through verbatim; those files do not exist locally.
#[derive(Debug, Clone, Default)]
pub struct TransferPlan {
    pub to_upload: Vec<PlannedUpload>,
    pub to_delete: Vec<String>,
    pub to_ignore: Vec<String>,
}

impl TransferPlan {
    /// `true` when no transfer or deletion is needed: the project already
    /// matches the warehouse.
    pub fn is_noop(&self) -> bool {
        self.to_upload.is_empty() && self.to_delete.is_empty()
    }
}

/// Partitions `manifest` according to `decision`.
///
/// Pure function: no filesystem, no network, no side effects. Fails with
/// [`PlanError::UnknownPath`] if the decision's `create` or `update` lists
/// name a path absent from the manifest, which means the warehouse and
/// this client disagree about what was submitted.
pub fn plan(manifest: &[FileRecord], decision: &RemoteDecision) -> Result<TransferPlan, PlanError> {
    let known: HashSet<&str> = manifest.iter().map(|r| r.relative_path.as_str()).collect();
    for path in decision.create.iter().chain(decision.update.iter()) {
        if !known.contains(path.as_str()) {
            return Err(PlanError::UnknownPath { path: path.clone() });
        }
    }

    let create: HashSet<&str> = decision.create.iter().map(String::as_str).collect();
    let update: HashSet<&str> = decision.update.iter().map(String::as_str).collect();

    let mut plan = TransferPlan {
        to_delete: decision.delete.clone(),
        ..TransferPlan::default()
    };

    for record in manifest {
        let rel = record.relative_path.as_str();
        if create.contains(rel) {
            plan.to_upload.push(PlannedUpload {
                record: record.clone(),
                is_update: false,
            });
        } else if update.contains(rel) {
            plan.to_upload.push(PlannedUpload {
                record: record.clone(),
                is_update: true,
            });
        } else {
            plan.to_ignore.push(record.relative_path.clone());
        }
    }

    Ok(plan)
}
