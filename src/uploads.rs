// Upload staging area
// Uploaded CSV files live here only while they are imported; the guard deletes them on drop.

use crate::error::{InventoryError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct UploadArea {
    dir: PathBuf,
}

/// A staged upload. The file is removed when the guard goes out of scope,
/// whether the import succeeded, failed or panicked.
#[derive(Debug)]
pub struct UploadGuard {
    path: PathBuf,
}

impl UploadGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "upload removed"),
            Err(err) => warn!(path = %self.path.display(), error = %err, "failed to remove upload"),
        }
    }
}

pub fn is_csv_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".csv")
}

impl UploadArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        UploadArea { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an uploaded file into the area under a unique name.
    ///
    /// Only the extension of `original_name` is trusted; path components in
    /// it are discarded.
    pub fn stage(&self, original_name: &str, bytes: &[u8]) -> Result<UploadGuard> {
        if !is_csv_name(original_name) {
            return Err(InventoryError::validation(
                "file",
                format!("'{}' is not a .csv file", original_name),
            ));
        }

        fs::create_dir_all(&self.dir)?;

        let base = Path::new(original_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        let path = self.dir.join(format!("{}_{}", uuid::Uuid::new_v4(), base));

        fs::write(&path, bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "upload staged");

        Ok(UploadGuard { path })
    }
}
