//! Document retrieval.

use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Bucket and key parsed from an `s3://bucket/key` locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    /// Bucket name
    pub bucket: String,
    /// Object key within the bucket
    pub key: String,
}

impl ObjectLocation {
    /// Parse `s3://bucket/key`.
    pub fn parse(location: &str) -> Result<Self> {
        let rest = location
            .strip_prefix("s3://")
            .ok_or_else(|| Error::DocumentUnavailable(format!("'{}' is not an s3:// location", location)))?;
        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Self {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            _ => Err(Error::DocumentUnavailable(format!(
                "'{}' does not name both a bucket and a key",
                location
            ))),
        }
    }
}

/// Source of unsigned documents.
pub trait DocumentStore {
    /// Fetch the document at `location`.
    fn retrieve(&self, location: &str) -> Result<Vec<u8>>;
}

/// Buckets as directories under a root directory.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    /// Store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a parsed location; keys may not leave their bucket.
    pub fn path_for(&self, location: &ObjectLocation) -> Result<PathBuf> {
        let relative = Path::new(&location.bucket).join(&location.key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::DocumentUnavailable(format!(
                "Key '{}' escapes bucket '{}'",
                location.key, location.bucket
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl DocumentStore for FileSystemStore {
    fn retrieve(&self, location: &str) -> Result<Vec<u8>> {
        let parsed = ObjectLocation::parse(location)?;
        let path = self.path_for(&parsed)?;
        log::debug!("Retrieving {} from {}", location, path.display());
        std::fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::Storage {
                status: 404,
                message: format!("No object '{}' in bucket '{}'", parsed.key, parsed.bucket),
            },
            ErrorKind::PermissionDenied => Error::Storage {
                status: 403,
                message: format!("Access denied to '{}'", location),
            },
            _ => Error::DocumentUnavailable(format!("Cannot read '{}': {}", location, e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        let parsed = ObjectLocation::parse("s3://documents/2024/abc.pdf").unwrap();
        assert_eq!(parsed.bucket, "documents");
        assert_eq!(parsed.key, "2024/abc.pdf");
    }

    #[test]
    fn test_unparseable_locations() {
        for location in ["documents/abc.pdf", "s3://documents", "s3:///abc.pdf", "s3://documents/"] {
            assert!(
                matches!(ObjectLocation::parse(location), Err(Error::DocumentUnavailable(_))),
                "{}",
                location
            );
        }
    }

    #[test]
    fn test_retrieve_existing_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs").join("a.pdf"), b"%PDF-1.4").unwrap();

        let store = FileSystemStore::new(dir.path());
        assert_eq!(store.retrieve("s3://docs/a.pdf").unwrap(), b"%PDF-1.4");

        let err = store.retrieve("s3://docs/missing.pdf").unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_key_cannot_escape_bucket() {
        let store = FileSystemStore::new("/srv/store");
        let location = ObjectLocation::parse("s3://docs/../secrets.pdf").unwrap();
        assert!(store.path_for(&location).is_err());
    }
}
