//! On-disk layout of the versions directory.
//!
//! ```text
//! <versions_dir>/
//! ├── Downloading/        staging area of the download in progress
//! ├── PartialDownload/    staging area of an interrupted download
//! ├── <version>/          promoted, complete versions
//! └── <version>/
//! ```
//!
//! Every directory holds `program.json` plus the assets stored for that
//! version at their manifest paths.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{UpdateError, UpdateResult};

/// Staging directory name.
pub const DOWNLOADING_DIR: &str = "Downloading";

/// Recovery directory name.
pub const PARTIAL_DOWNLOAD_DIR: &str = "PartialDownload";

/// Paths inside the versions directory.
#[derive(Debug, Clone)]
pub struct VersionsLayout {
    root: PathBuf,
}

impl VersionsLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The versions directory itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Staging directory for the download in progress.
    pub fn downloading_dir(&self) -> PathBuf {
        self.root.join(DOWNLOADING_DIR)
    }

    /// Directory an interrupted download is moved to.
    pub fn partial_download_dir(&self) -> PathBuf {
        self.root.join(PARTIAL_DOWNLOAD_DIR)
    }

    /// Permanent directory of `version`.
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.root.join(version)
    }

    /// Whether `name` is one of the staging directories.
    pub fn is_staging_name(name: &str) -> bool {
        name == DOWNLOADING_DIR || name == PARTIAL_DOWNLOAD_DIR
    }

    /// Create the versions directory if needed.
    pub fn ensure_root(&self) -> UpdateResult<()> {
        fs::create_dir_all(&self.root)
            .map_err(|e| UpdateError::directory_io("create directory", &self.root, e))
    }

    /// Promoted version directories, as `(version, path)` pairs.
    pub fn version_directories(&self) -> UpdateResult<Vec<(String, PathBuf)>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(UpdateError::directory_io("list directory", &self.root, e)),
        };

        let mut versions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if Self::is_staging_name(&name) {
                continue;
            }
            versions.push((name, path));
        }
        versions.sort();
        Ok(versions)
    }

    /// Prepare an empty staging directory.
    ///
    /// A leftover staging directory from an earlier, interrupted download is
    /// kept as `PartialDownload` so its files can be reused. Returns whether a
    /// partial download is available.
    pub async fn prepare_staging(&self) -> UpdateResult<bool> {
        let downloading = self.downloading_dir();
        let partial = self.partial_download_dir();

        if tokio::fs::try_exists(&downloading).await.unwrap_or(false) {
            remove_dir_if_exists(&partial).await?;
            tokio::fs::rename(&downloading, &partial)
                .await
                .map_err(|e| UpdateError::directory_io("rename directory", &downloading, e))?;
            debug!(path = %partial.display(), "Kept interrupted download for reuse");
        }

        tokio::fs::create_dir_all(&downloading)
            .await
            .map_err(|e| UpdateError::directory_io("create directory", &downloading, e))?;

        Ok(tokio::fs::try_exists(&partial).await.unwrap_or(false))
    }

    /// Move the staging directory to the permanent directory of `version`.
    pub async fn promote(&self, version: &str) -> UpdateResult<PathBuf> {
        let downloading = self.downloading_dir();
        let target = self.version_dir(version);

        remove_dir_if_exists(&target).await?;
        tokio::fs::rename(&downloading, &target)
            .await
            .map_err(|e| UpdateError::directory_io("rename directory", &downloading, e))?;
        Ok(target)
    }

    /// Delete a directory tree, logging instead of failing.
    pub fn remove_best_effort(path: &Path) {
        match fs::remove_dir_all(path) {
            Ok(()) => debug!(path = %path.display(), "Removed directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Could not remove directory"),
        }
    }
}

async fn remove_dir_if_exists(path: &Path) -> UpdateResult<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(UpdateError::directory_io("remove directory", path, e)),
    }
}
