//! Filesystem helpers shared by the file-backed stores.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};

/// Reject keys that could escape their directory.
///
/// Keys become file names, so only ASCII alphanumerics, `-` and `_` are
/// accepted.
pub fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::invalid_key(key))
    }
}

/// Path of the JSON record for `key` inside `dir`.
pub fn record_path(dir: &Path, key: &str) -> StoreResult<PathBuf> {
    validate_key(key)?;
    Ok(dir.join(format!("{}.json", key)))
}

/// Write `bytes` to `path` atomically.
///
/// The data goes to a temp file in the same directory, is synced, and is
/// then renamed over the target, so readers see the old or the new content
/// and never a partial write.
pub async fn write_atomic(path: PathBuf, bytes: Vec<u8>) -> StoreResult<()> {
    tokio::task::spawn_blocking(move || -> StoreResult<()> {
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::invalid_key(path.display().to_string()))?;
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

/// Read a file, mapping a missing file to `None`.
pub async fn read_optional(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Remove a file, returning whether it existed.
pub async fn remove_optional(path: &Path) -> StoreResult<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("3f0c1a2e-9b7d-4c55-a1f2-0e4d5c6b7a89").is_ok());
        assert!(validate_key("user_42").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("a.json").is_err());
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("record.json");

        write_atomic(path.clone(), b"first".to_vec()).await.unwrap();
        write_atomic(path.clone(), b"second".to_vec()).await.unwrap();

        let content = read_optional(&path).await.unwrap();
        assert_eq!(content.as_deref(), Some(&b"second"[..]));

        // No temp files left behind
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_optional_helpers_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        assert!(read_optional(&path).await.unwrap().is_none());
        assert!(!remove_optional(&path).await.unwrap());
    }
}
