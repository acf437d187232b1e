// Rust guideline compliant 2026-10-19

//! File adapter for the `StatsStore` port.
//!
//! Every save writes pretty-printed JSON to a sibling `*.tmp` file and renames
//! it over the target, so readers polling the stats file never see a partial
//! document.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use monitor::{StatsDocument, StatsStore, StoreError};

/// `StatsStore` adapter that replaces one JSON file on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    staging: PathBuf,
}

impl JsonFileStore {
    /// Store documents at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut staging = OsString::from(path.as_os_str());
        staging.push(".tmp");
        Self { path, staging: PathBuf::from(staging) }
    }

    /// Target file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatsStore for JsonFileStore {
    /// Serialize `document` and atomically replace the target file.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] if serialization fails, or
    /// [`StoreError::Io`] if the staging write or the rename fails.
    async fn save(&self, document: &StatsDocument) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(document)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.staging, json).await?;
        tokio::fs::rename(&self.staging, &self.path).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
