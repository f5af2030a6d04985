//! Shared setup for commands that operate on the version store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hotpush::bundle::AssetBundle;
use hotpush::config::{ConfigFile, UpdateConfig};
use hotpush::lifecycle::{JsonFilePreferences, ShellHost, VersionLifecycle};
use hotpush::manager::ReqwestTransport;
use tracing::info;

use crate::error::CliError;

const PREFERENCES_FILENAME: &str = "preferences.json";

/// Load the configuration file from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => Ok(ConfigFile::load()?),
    }
}

/// Host stand-in: there is no web view to reload from the command line.
struct CliHost;

impl ShellHost for CliHost {
    fn reload(&self) {
        info!("Reload requested; restart the app to serve the pending version");
    }
}

/// Everything a command needs to drive the lifecycle.
pub struct Session {
    pub config: UpdateConfig,
    pub root_url: Option<String>,
    pub lifecycle: Arc<VersionLifecycle>,
}

impl Session {
    /// Load the bundled version and open the version store.
    pub fn open(file: &ConfigFile) -> Result<Self, CliError> {
        let initial_dir = file.updates.initial_bundle_dir.clone().ok_or_else(|| {
            CliError::Config(
                "initial_bundle_dir is not set. \
                 Use 'hotpush config set updates.initial_bundle_dir <path>'"
                    .to_string(),
            )
        })?;

        let config = file.to_update_config();
        let initial = AssetBundle::load(initial_dir, None)?;
        let transport = ReqwestTransport::with_timeout(config.http_timeout)?;
        let preferences = JsonFilePreferences::open(preferences_path(file, &config))?;

        let lifecycle = VersionLifecycle::initialize(
            config.clone(),
            Arc::new(initial),
            Arc::new(transport),
            Arc::new(preferences),
            Arc::new(CliHost),
        )?;

        Ok(Self {
            config,
            root_url: file.updates.root_url.clone(),
            lifecycle,
        })
    }
}

/// Preferences live next to the versions directory unless configured.
fn preferences_path(file: &ConfigFile, config: &UpdateConfig) -> PathBuf {
    file.updates.preferences_file.clone().unwrap_or_else(|| {
        config
            .versions_dir
            .parent()
            .unwrap_or(&config.versions_dir)
            .join(PREFERENCES_FILENAME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotpush::config::UpdatesSection;

    #[test]
    fn test_preferences_default_next_to_versions() {
        let file = ConfigFile {
            updates: UpdatesSection {
                versions_dir: Some(PathBuf::from("/data/app/versions")),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = file.to_update_config();

        assert_eq!(
            preferences_path(&file, &config),
            PathBuf::from("/data/app/preferences.json")
        );
    }

    #[test]
    fn test_missing_initial_bundle_is_config_error() {
        let result = Session::open(&ConfigFile::default());
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
