//! The encrypted on-disk copy of the custody's license.
//!
//! The file holds raw ciphertext bytes. Writes go to a temporary sibling
//! which is then renamed over the target, so a crash mid-write leaves the
//! previous file intact.

use crate::error::{LicenseError, LicenseResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Location of the cache file.
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    /// Creates a handle for the given path. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the cache file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file. Returns `Ok(None)` if it does not exist; any other
    /// I/O error is a [`LicenseError::Storage`].
    pub async fn read(&self) -> LicenseResult<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LicenseError::Storage(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Replaces the file contents all-or-nothing.
    pub async fn write(&self, bytes: &[u8]) -> LicenseResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                LicenseError::Storage(format!("failed to prepare {}: {e}", parent.display()))
            })?;
        }

        let temp_path = self
            .path
            .with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&temp_path, bytes).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(LicenseError::Storage(format!(
                "failed to write {}: {e}",
                temp_path.display()
            )));
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(LicenseError::Storage(format!(
                "failed to finalize {}: {e}",
                self.path.display()
            )));
        }

        Ok(())
    }

    /// Deletes the file. A missing file is not an error.
    pub async fn remove(&self) -> LicenseResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LicenseError::Storage(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}
