use std::collections::HashMap;

use tokio::task::JoinSet;
use wsync_protocol::{ChunkingConfig, FileRecord};

use crate::{Fingerprint, FingerprintError, fingerprint_file};

/// Fingerprints every file in the manifest concurrently.
///
/// Hashing is I/O-bound, so each file runs on the blocking pool and the
/// results are reassembled keyed by relative path; nothing depends on
/// completion order. Any single failure aborts the whole computation: an
/// unreadable manifest entry means the sync input is unusable.
pub async fn fingerprint_manifest(
    manifest: &[FileRecord],
    config: &ChunkingConfig,
) -> Result<HashMap<String, Fingerprint>, FingerprintError> {
    config.validate()?;

    let mut set = JoinSet::new();
    for record in manifest {
        let path = record.absolute_path.clone();
        let rel = record.relative_path.clone();
        let config = *config;
        set.spawn_blocking(move || (rel, fingerprint_file(&path, &config)));
    }

    let mut fingerprints = HashMap::with_capacity(manifest.len());
    while let Some(joined) = set.join_next().await {
        let (rel, result) = joined.map_err(|e| FingerprintError::TaskJoin(e.to_string()))?;
        let fingerprint = result?;
        fingerprints.insert(rel, fingerprint);
    }
    Ok(fingerprints)
}
