// crashlog-sleuth - platform/hash.rs
//
// File hashing service used by the File Integrity analyzer to
// compare the game executable against a known-version table.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::util::error::CrashLogError;

/// SHA-256 hex digest of the file at `path`.
pub fn hash_file(path: &Path) -> Result<String, CrashLogError> {
    let bytes = std::fs::read(path).map_err(|source| CrashLogError::Io {
        path: path.to_path_buf(),
        operation: "hash_file",
        source,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Table of known executable hashes to version labels. Placeholder values
/// until real hashes are sourced for this game family.
pub fn known_hash_table() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "0000000000000000000000000000000000000000000000000000000000000",
            "1.10.163 (pre-next-gen)",
        ),
        (
            "1111111111111111111111111111111111111111111111111111111111111",
            "1.10.984 (next-gen)",
        ),
    ]
}

/// Look up `hash` in the known table, returning its version label if
/// present.
pub fn lookup_version(hash: &str) -> Option<&'static str> {
    known_hash_table()
        .into_iter()
        .find(|(known, _)| *known == hash)
        .map(|(_, label)| label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_file_produces_stable_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let file_path = tmp.path().join("exe.bin");
        std::fs::write(&file_path, b"fallout4.exe contents").unwrap();

        let first = hash_file(&file_path).unwrap();
        let second = hash_file(&file_path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn lookup_version_returns_none_for_unknown_hash() {
        assert!(lookup_version("deadbeef").is_none());
    }
}
