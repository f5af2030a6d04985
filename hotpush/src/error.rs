//! Error types for hot code push operations.
//!
//! Every failure in manifest parsing, downloading, and directory management is
//! expressed as an [`UpdateError`]. Failures that happen inside the bundle
//! manager are not returned to callers directly; they are routed to the
//! manager's delegate so there is a single reporting channel.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for hot code push operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Errors that can occur while fetching, verifying, or storing asset bundles.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The manifest is not valid JSON or lacks a required key.
    #[error("malformed asset manifest: {0}")]
    MalformedManifest(String),

    /// The manifest declares a format this client does not understand.
    #[error("incompatible asset manifest format: {found:?}")]
    FormatIncompatible { found: Option<String> },

    /// A request could not reach the server.
    #[error("error fetching {url}: {reason}")]
    TransportFailure { url: String, reason: String },

    /// A response arrived but could not be accepted.
    #[error("failed to download {url}: {reason}")]
    DownloadFailure { url: String, reason: String },

    /// A directory or file operation failed.
    #[error("{operation} failed for {}: {source}", path.display())]
    DirectoryIo {
        operation: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    /// An update check was requested without a root URL to check against.
    #[error("checking for updates requires a root URL to be configured")]
    MissingRootUrl,

    /// A URL could not be parsed or joined.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl UpdateError {
    /// Build a [`UpdateError::DirectoryIo`] from an I/O error.
    pub fn directory_io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::DirectoryIo {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Build a [`UpdateError::DownloadFailure`].
    pub fn download_failure(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DownloadFailure {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from manifest parsing.
    pub fn is_manifest_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedManifest(_) | Self::FormatIncompatible { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_failure_display() {
        let err = UpdateError::download_failure("http://example.com/app.js", "hash mismatch");
        assert_eq!(
            err.to_string(),
            "failed to download http://example.com/app.js: hash mismatch"
        );
    }

    #[test]
    fn test_directory_io_display_and_source() {
        let err = UpdateError::directory_io(
            "create directory",
            "/tmp/versions/Downloading",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("create directory failed"));
        assert!(err.to_string().contains("/tmp/versions/Downloading"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_is_manifest_error() {
        assert!(UpdateError::MalformedManifest("x".to_string()).is_manifest_error());
        assert!(UpdateError::FormatIncompatible { found: None }.is_manifest_error());
        assert!(!UpdateError::MissingRootUrl.is_manifest_error());
    }
}
