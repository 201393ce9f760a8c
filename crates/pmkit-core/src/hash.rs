//! SHA-256 content digests, hex encoded.

use crate::error::{PmKitError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Digest of a file's raw bytes. Name, timestamps and permissions play no part.
pub fn hash_file(path: &Path) -> Result<String> {
    let read_err = |source| PmKitError::FileRead {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_err)?;
    hash_reader(file).map_err(read_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn known_digest() {
        assert_eq!(
            hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn file_hash_ignores_name() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("one.md"), "same").unwrap();
        std::fs::write(dir.path().join("two.md"), "same").unwrap();
        assert_eq!(
            hash_file(&dir.path().join("one.md")).unwrap(),
            hash_file(&dir.path().join("two.md")).unwrap()
        );
        assert_eq!(hash_file(&dir.path().join("one.md")).unwrap(), hash_bytes(b"same"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = hash_file(&dir.path().join("gone.md")).unwrap_err();
        assert!(matches!(err, PmKitError::FileRead { .. }));
    }
}
