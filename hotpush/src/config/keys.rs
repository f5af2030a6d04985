//! Addressable configuration keys in `section.key` form.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFile;
use crate::error::{UpdateError, UpdateResult};

/// A single setting of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    RootUrl,
    VersionsDir,
    InitialBundleDir,
    PreferencesFile,
    StartupTimeoutSecs,
    MaxRequestsPerHost,
    Platform,
    LogFilter,
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::RootUrl,
            ConfigKey::VersionsDir,
            ConfigKey::InitialBundleDir,
            ConfigKey::PreferencesFile,
            ConfigKey::StartupTimeoutSecs,
            ConfigKey::MaxRequestsPerHost,
            ConfigKey::Platform,
            ConfigKey::LogFilter,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::LogFilter => "logging",
            _ => "updates",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::RootUrl => "root_url",
            ConfigKey::VersionsDir => "versions_dir",
            ConfigKey::InitialBundleDir => "initial_bundle_dir",
            ConfigKey::PreferencesFile => "preferences_file",
            ConfigKey::StartupTimeoutSecs => "startup_timeout_secs",
            ConfigKey::MaxRequestsPerHost => "max_requests_per_host",
            ConfigKey::Platform => "platform",
            ConfigKey::LogFilter => "filter",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        let updates = &config.updates;
        let path = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string());
        let value = match self {
            ConfigKey::RootUrl => updates.root_url.clone(),
            ConfigKey::VersionsDir => path(&updates.versions_dir),
            ConfigKey::InitialBundleDir => path(&updates.initial_bundle_dir),
            ConfigKey::PreferencesFile => path(&updates.preferences_file),
            ConfigKey::StartupTimeoutSecs => updates.startup_timeout_secs.map(|v| v.to_string()),
            ConfigKey::MaxRequestsPerHost => updates.max_requests_per_host.map(|v| v.to_string()),
            ConfigKey::Platform => updates.platform.clone(),
            ConfigKey::LogFilter => config.logging.filter.clone(),
        };
        value.unwrap_or_default()
    }

    /// Set from text. An empty value clears the setting.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> UpdateResult<()> {
        let value = value.trim();
        let text = (!value.is_empty()).then(|| value.to_string());
        let updates = &mut config.updates;

        match self {
            ConfigKey::RootUrl => {
                if let Some(url) = &text {
                    url::Url::parse(url).map_err(|e| UpdateError::InvalidUrl {
                        url: url.clone(),
                        reason: e.to_string(),
                    })?;
                }
                updates.root_url = text;
            }
            ConfigKey::VersionsDir => updates.versions_dir = text.map(PathBuf::from),
            ConfigKey::InitialBundleDir => updates.initial_bundle_dir = text.map(PathBuf::from),
            ConfigKey::PreferencesFile => updates.preferences_file = text.map(PathBuf::from),
            ConfigKey::StartupTimeoutSecs => {
                updates.startup_timeout_secs = parse_number(text, self)?;
            }
            ConfigKey::MaxRequestsPerHost => {
                let max: Option<usize> = parse_number(text, self)?;
                if max == Some(0) {
                    return Err(UpdateError::Config(format!(
                        "{} must be at least 1",
                        self.name()
                    )));
                }
                updates.max_requests_per_host = max;
            }
            ConfigKey::Platform => updates.platform = text,
            ConfigKey::LogFilter => config.logging.filter = text,
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| UpdateError::Config(format!("unknown configuration key '{}'", s)))
    }
}

fn parse_number<T: FromStr>(text: Option<String>, key: &ConfigKey) -> UpdateResult<Option<T>> {
    text.map(|v| {
        v.parse::<T>()
            .map_err(|_| UpdateError::Config(format!("invalid value '{}' for {}", v, key.name())))
    })
    .transpose()
}
