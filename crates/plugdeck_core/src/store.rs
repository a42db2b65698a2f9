//! File access for manifests, plugin files and the composed output.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;

/// Reads and writes files relative to some root.
pub trait PluginStore: Send + Sync {
    /// Returns `None` when the file does not exist.
    fn read_text(&self, path: &Path) -> Result<Option<String>, StoreError>;

    /// Writes `bytes`, creating parent directories as needed.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError>;

    /// Deletes a file. Returns `false` if it was already missing.
    fn delete(&self, path: &Path) -> Result<bool, StoreError>;
}

/// [`PluginStore`] over the local filesystem.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl PluginStore for FsStore {
    fn read_text(&self, path: &Path) -> Result<Option<String>, StoreError> {
        let full = self.full_path(path);
        match fs::read_to_string(&full) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(full, e)),
        }
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        fs::write(&full, bytes).map_err(|e| StoreError::io(&full, e))?;
        debug!("Wrote {} ({} bytes)", full.display(), bytes.len());
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<bool, StoreError> {
        let full = self.full_path(path);
        match fs::remove_file(&full) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(full, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_creates_parents_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        store
            .write(Path::new("sdk/Plugins/Ads/Ads.cs"), b"class Ads {}")
            .unwrap();

        assert_eq!(
            store.read_text(Path::new("sdk/Plugins/Ads/Ads.cs")).unwrap(),
            Some("class Ads {}".to_string())
        );
        assert!(dir.path().join("sdk/Plugins/Ads/Ads.cs").is_file());
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        assert_eq!(store.read_text(Path::new("nope.json")).unwrap(), None);
    }

    #[test]
    fn test_delete_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store.write(Path::new("a.cs"), b"a").unwrap();

        assert!(store.delete(Path::new("a.cs")).unwrap());
        assert!(!store.delete(Path::new("a.cs")).unwrap());
    }

    #[test]
    fn test_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store.write(Path::new("a.cs"), b"old").unwrap();
        store.write(Path::new("a.cs"), b"new").unwrap();

        assert_eq!(
            store.read_text(Path::new("a.cs")).unwrap().as_deref(),
            Some("new")
        );
    }
}
