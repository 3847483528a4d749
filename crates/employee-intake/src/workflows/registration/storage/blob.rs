use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// Key prefix under which report artifacts are stored.
pub const REPORT_PREFIX: &str = "reports";
const FALLBACK_NAME: &str = "document.html";

/// Opaque byte storage addressed by the keys it hands out.
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` and returns the key to fetch them back with.
    fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, BlobError>;
    fn fetch(&self, key: &str) -> Result<Vec<u8>, BlobError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("blob key {0} is outside the store")]
    InvalidKey(String),
    #[error("blob {0} not found")]
    NotFound(String),
}

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FileSystemBlobStore {
    root: PathBuf,
}

impl FileSystemBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(key);
        let contained = !key.trim().is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !contained {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn file_name(suggested: &str) -> String {
    Path::new(suggested.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

impl BlobStore for FileSystemBlobStore {
    fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, BlobError> {
        let key = format!("{REPORT_PREFIX}/{}", file_name(suggested_name));
        let path = self.resolve(&key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        debug!(%key, size = bytes.len(), "stored blob");
        Ok(key)
    }

    fn fetch(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.resolve(key)?;
        fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => BlobError::NotFound(key.to_string()),
            _ => BlobError::Io(err),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_under_report_prefix_and_reads_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileSystemBlobStore::new(dir.path());

        let key = store
            .store(b"<html></html>", "REPORT-AB.html")
            .expect("stored");
        assert_eq!(key, "reports/REPORT-AB.html");
        assert_eq!(store.fetch(&key).expect("fetched"), b"<html></html>".to_vec());
    }

    #[test]
    fn suggested_names_cannot_escape_the_root() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileSystemBlobStore::new(dir.path());

        let key = store.store(b"x", "../../etc/passwd").expect("stored");
        assert_eq!(key, "reports/passwd");

        let key = store.store(b"x", "   ").expect("stored");
        assert_eq!(key, "reports/document.html");
    }

    #[test]
    fn rejects_traversal_and_reports_missing_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileSystemBlobStore::new(dir.path());

        assert!(matches!(
            store.fetch("../secret"),
            Err(BlobError::InvalidKey(_))
        ));
        assert!(matches!(store.fetch("/etc/hosts"), Err(BlobError::InvalidKey(_))));
        assert!(matches!(
            store.fetch("reports/missing.html"),
            Err(BlobError::NotFound(_))
        ));
    }
}
