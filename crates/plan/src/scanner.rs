//! Directory scanning for sync.
//!
//! Recursively walks a project directory and produces the local manifest
//! with relative paths normalized to forward slashes.

use std::path::Path;

use wsync_protocol::FileRecord;

use crate::PlanError;

/// Scans a project directory and returns its manifest.
///
/// Relative paths use `/` as separator (even on Windows) to match the
/// warehouse's path keys. Hidden entries (names starting with `.`) are
/// skipped, files and directories both. The manifest is sorted by
/// relative path so repeated scans of the same tree are identical.
pub fn scan_project(root: &Path) -> Result<Vec<FileRecord>, PlanError> {
    let mut records = Vec::new();
    walk_dir(root, root, &mut records)?;
    records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(records)
}

fn walk_dir(root: &Path, current: &Path, records: &mut Vec<FileRecord>) -> Result<(), PlanError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;

        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        if metadata.is_dir() {
            walk_dir(root, &path, records)?;
        } else if metadata.is_file() {
            let rel_path = path.strip_prefix(root).map_err(std::io::Error::other)?;
            let rel_str = rel_path.to_string_lossy().replace('\\', "/");

            records.push(FileRecord {
                absolute_path: path,
                relative_path: rel_str,
                size: metadata.len(),
            });
        }
    }

    Ok(())
}
