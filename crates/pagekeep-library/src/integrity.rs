// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content fingerprints: SHA-256 digests used to tell whether an imported
// PDF is the same file already sitting in the library.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use pagekeep_core::error::PagekeepError;
use sha2::{Digest, Sha256};

/// SHA-256 of `data` as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// SHA-256 of a file's contents, streamed.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String, PagekeepError> {
    let mut file = File::open(path.as_ref())?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Whether two files have identical contents.
pub fn same_content(a: impl AsRef<Path>, b: impl AsRef<Path>) -> Result<bool, PagekeepError> {
    let (a, b) = (a.as_ref(), b.as_ref());
    if std::fs::metadata(a)?.len() != std::fs::metadata(b)?.len() {
        return Ok(false);
    }
    Ok(hash_file(a)? == hash_file(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    }

    #[test]
    fn file_hash_matches_byte_hash() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"hello").expect("write");
        assert_eq!(hash_file(&path).expect("hash"), hash_bytes(b"hello"));
    }

    #[test]
    fn same_content_detects_difference() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (a, b, c) = (dir.path().join("a"), dir.path().join("b"), dir.path().join("c"));
        std::fs::write(&a, b"one").expect("write");
        std::fs::write(&b, b"one").expect("write");
        std::fs::write(&c, b"two").expect("write");
        assert!(same_content(&a, &b).expect("compare"));
        assert!(!same_content(&a, &c).expect("compare"));
    }
}
