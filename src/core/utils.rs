use chrono::{DateTime, Utc};
use log::debug;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::core::errors::WitnessResult;
use crate::core::types::*;

/// Compute SHA256 hash of data
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA256 over the concatenation of several slices
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Hex of the first 8 bytes of SHA-256 over the input.
///
/// Used for identity fingerprints and document identifiers.
pub fn fingerprint_hex(data: &[u8]) -> String {
    let digest = sha256(data);
    hex::encode(&digest[..8])
}

/// Derive the document identifier from an absolute document path
pub fn document_id(absolute_path: &str) -> String {
    fingerprint_hex(absolute_path.as_bytes())
}

/// Nanoseconds since the Unix epoch for a timestamp, saturating at zero
/// outside the representable range.
pub fn timestamp_ns(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_nanos_opt().unwrap_or(0)
}

/// Create a directory (and parents) restricted to the owning user
pub fn create_private_dir(path: impl AsRef<Path>) -> WitnessResult<()> {
    let path = path.as_ref();
    fs::create_dir_all(path)?;
    set_mode(path, STATE_DIR_MODE)?;
    Ok(())
}

/// Atomically write a private file: write to `.tmp`, chmod, rename.
///
/// The temp file is removed on failure so partial writes never become
/// visible under the final name.
pub fn atomic_write_private(path: impl AsRef<Path>, data: &[u8]) -> WitnessResult<()> {
    let path = path.as_ref();
    let tmp = path.with_extension("tmp");

    fs::write(&tmp, data)?;
    if let Err(e) = set_mode(&tmp, STATE_FILE_MODE) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> WitnessResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> WitnessResult<()> {
    Ok(())
}

/// Performance timing utilities
pub struct PerformanceTimer {
    start_time: std::time::Instant,
    operation_name: String,
}

impl PerformanceTimer {
    pub fn new(operation_name: &str) -> Self {
        Self {
            start_time: std::time::Instant::now(),
            operation_name: operation_name.to_string(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn finish(self) -> u64 {
        let elapsed = self.elapsed_ms();
        debug!("{} completed in {}ms", self.operation_name, elapsed);
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256 of the empty string
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_concat_matches_single_pass() {
        let joined = [b"abc".as_ref(), b"def".as_ref()].concat();
        assert_eq!(sha256(&joined), sha256_concat(&[b"abc", b"def"]));
    }

    #[test]
    fn test_fingerprint_is_16_hex_chars() {
        let fp = fingerprint_hex(b"some public key material");
        assert_eq!(fp.len(), 16);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_document_id_deterministic() {
        let a = document_id("/home/author/draft.txt");
        let b = document_id("/home/author/draft.txt");
        let c = document_id("/home/author/other.txt");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_atomic_write_private() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("seed.bin");
        atomic_write_private(&path, b"secret").expect("write");
        assert_eq!(fs::read(&path).expect("read"), b"secret");
        assert!(!path.with_extension("tmp").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).expect("meta").permissions().mode();
            assert_eq!(mode & 0o777, STATE_FILE_MODE);
        }
    }
}
