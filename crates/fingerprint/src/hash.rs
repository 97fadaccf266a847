use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};
use wsync_protocol::ChunkingConfig;

use crate::{ChunkReader, FingerprintError};

/// A content-derived identifier for one file.
///
/// The `value` string is what gets submitted to the warehouse and compared
/// against its stored identifiers. Two byte-identical files under the same
/// chunking configuration always produce the same value, regardless of
/// where they live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub value: String,
    pub size: u64,
}

/// Computes the fingerprint of the file at `path`.
///
/// Files below the multipart threshold get a whole-file digest tagged with
/// a `-1` part marker. Files at or above it are split into `chunk_size`
/// chunks; each chunk is digested, the raw digests are concatenated in
/// chunk order, and the concatenation is digested again, yielding
/// `<hex>-<part_count>`. The part count disambiguates near-identical
/// content split into different chunk counts.
///
/// The two forms can never collide: the one-part multipart value digests a
/// 16-byte digest rather than the file bytes.
pub fn fingerprint_file(
    path: &Path,
    config: &ChunkingConfig,
) -> Result<Fingerprint, FingerprintError> {
    config.validate()?;

    let size = std::fs::metadata(path)?.len();
    if !config.is_multipart(size) {
        return whole_file_fingerprint(path, size);
    }
    multipart_fingerprint(path, size, config.chunk_size)
}

fn whole_file_fingerprint(path: &Path, size: u64) -> Result<Fingerprint, FingerprintError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Fingerprint {
        value: format!("{}-1", hex::encode(hasher.finalize())),
        size,
    })
}

fn multipart_fingerprint(
    path: &Path,
    size: u64,
    chunk_size: u64,
) -> Result<Fingerprint, FingerprintError> {
    let mut reader = ChunkReader::new(path, chunk_size)?;
    let mut combined = Vec::new();
    let mut parts: u64 = 0;

    while let Some(chunk) = reader.next_chunk()? {
        let digest = Md5::digest(&chunk.data);
        combined.extend_from_slice(&digest);
        parts += 1;
    }

    // A zero-byte file at threshold zero still counts as one (empty) part.
    if parts == 0 {
        combined.extend_from_slice(&Md5::digest(b""));
        parts = 1;
    }

    Ok(Fingerprint {
        value: format!("{}-{parts}", hex::encode(Md5::digest(&combined))),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    fn cfg(chunk_size: u64, threshold: u64) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size,
            multipart_threshold: threshold,
        }
    }

    #[test]
    fn identical_content_identical_fingerprint() {
        let dir = TempDir::new().unwrap();
        let a = create_test_file(dir.path(), "a.bin", b"same bytes");
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let b = create_test_file(dir.path(), "nested/b.bin", b"same bytes");

        let config = cfg(4, 100);
        let fa = fingerprint_file(&a, &config).unwrap();
        let fb = fingerprint_file(&b, &config).unwrap();
        assert_eq!(fa, fb);
        assert_eq!(fa.size, 10);
    }

    #[test]
    fn different_content_different_fingerprint() {
        let dir = TempDir::new().unwrap();
        let a = create_test_file(dir.path(), "a.bin", b"content A");
        let b = create_test_file(dir.path(), "b.bin", b"content B");

        let config = cfg(4, 100);
        assert_ne!(
            fingerprint_file(&a, &config).unwrap().value,
            fingerprint_file(&b, &config).unwrap().value
        );
    }

    #[test]
    fn small_file_is_single_part_form() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "small.bin", b"tiny");

        let fp = fingerprint_file(&path, &cfg(4, 100)).unwrap();
        assert!(fp.value.ends_with("-1"));
        // 32 hex chars + "-1".
        assert_eq!(fp.value.len(), 34);
    }

    #[test]
    fn threshold_boundary_is_multipart() {
        let dir = TempDir::new().unwrap();
        // 10 bytes, threshold 10: exactly at the boundary -> multipart.
        let at = create_test_file(dir.path(), "at.bin", b"0123456789");
        let under = create_test_file(dir.path(), "under.bin", b"012345678");

        let config = cfg(4, 10);
        let fp_at = fingerprint_file(&at, &config).unwrap();
        let fp_under = fingerprint_file(&under, &config).unwrap();

        // 10 bytes in 4-byte chunks -> 3 parts.
        assert!(fp_at.value.ends_with("-3"));
        assert!(fp_under.value.ends_with("-1"));
    }

    #[test]
    fn one_part_multipart_differs_from_whole_file_form() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "x.bin", b"0123456789");

        // Same bytes, same chunk size, only the threshold differs.
        let small = fingerprint_file(&path, &cfg(16, 100)).unwrap();
        let multi = fingerprint_file(&path, &cfg(16, 10)).unwrap();

        assert!(small.value.ends_with("-1"));
        assert!(multi.value.ends_with("-1"));
        assert_ne!(small.value, multi.value);
    }

    #[test]
    fn part_count_encoded_in_value() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "x.bin", &[7u8; 25]);

        // 25 bytes in 10-byte chunks -> 3 parts.
        let fp = fingerprint_file(&path, &cfg(10, 10)).unwrap();
        assert!(fp.value.ends_with("-3"));
        assert_eq!(fp.size, 25);
    }

    #[test]
    fn chunk_count_changes_fingerprint() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "x.bin", &[7u8; 24]);

        let f12 = fingerprint_file(&path, &cfg(12, 10)).unwrap();
        let f8 = fingerprint_file(&path, &cfg(8, 10)).unwrap();
        assert!(f12.value.ends_with("-2"));
        assert!(f8.value.ends_with("-3"));
        assert_ne!(f12.value, f8.value);
    }

    #[test]
    fn zero_chunk_size_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "x.bin", b"data");
        let result = fingerprint_file(&path, &cfg(0, 100));
        assert!(matches!(result, Err(FingerprintError::Config(_))));
    }

    #[test]
    fn unreadable_file_is_io_error() {
        let result = fingerprint_file(Path::new("/nonexistent/x.bin"), &cfg(4, 100));
        assert!(matches!(result, Err(FingerprintError::Io(_))));
    }
}
