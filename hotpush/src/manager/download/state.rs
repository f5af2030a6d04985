//! Download progress tracking.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::error::UpdateError;

/// How a bundle download ended.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Every missing asset was fetched and verified.
    Finished,
    /// An asset failed; the remaining requests were aborted.
    Failed(UpdateError),
    /// The download was canceled from outside.
    Canceled,
}

impl DownloadOutcome {
    /// Whether the download completed successfully.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// Set of asset URL paths that still have to be fetched.
///
/// Shared between the per-asset tasks; each successful asset removes itself
/// and the task that empties the set reports completion.
#[derive(Debug)]
pub struct MissingAssets {
    remaining: Mutex<HashSet<String>>,
    total: usize,
}

impl MissingAssets {
    /// Track the given URL paths.
    pub fn new(url_paths: impl IntoIterator<Item = String>) -> Self {
        let remaining: HashSet<String> = url_paths.into_iter().collect();
        let total = remaining.len();
        Self {
            remaining: Mutex::new(remaining),
            total,
        }
    }

    /// Mark `url_path` as downloaded. Returns `true` when this emptied the set.
    pub fn complete(&self, url_path: &str) -> bool {
        let mut remaining = self.remaining.lock();
        remaining.remove(url_path) && remaining.is_empty()
    }

    /// Number of assets not yet downloaded.
    pub fn remaining(&self) -> usize {
        self.remaining.lock().len()
    }

    /// Number of assets tracked at the start.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Whether nothing is left to download.
    pub fn is_empty(&self) -> bool {
        self.remaining.lock().is_empty()
    }
}
