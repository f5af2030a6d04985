//! Error type for CLI commands.

use std::fmt;

use hotpush::UpdateError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Missing or invalid configuration.
    Config(String),

    /// The update check did not produce a new version.
    UpdateFailed(String),

    /// A URL path has no file to serve.
    NotFound(String),

    /// Error from the update library.
    Update(UpdateError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::UpdateFailed(msg) => write!(f, "Update failed: {}", msg),
            CliError::NotFound(path) => write!(f, "No file to serve for {}", path),
            CliError::Update(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Update(e) => Some(e),
            _ => None,
        }
    }
}

impl From<UpdateError> for CliError {
    fn from(e: UpdateError) -> Self {
        CliError::Update(e)
    }
}
