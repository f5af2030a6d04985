//! INI configuration file.
//!
//! ```text
//! [updates]
//! root_url = https://app.example.com/
//! versions_dir = /var/lib/hotpush/versions
//! initial_bundle_dir = /opt/app/www/application
//! preferences_file = /var/lib/hotpush/preferences.json
//! startup_timeout_secs = 20
//! max_requests_per_host = 6
//! platform = android
//!
//! [logging]
//! filter = hotpush=debug
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;

use super::settings::UpdateConfig;
use crate::error::{UpdateError, UpdateResult};

const UPDATES_SECTION: &str = "updates";
const LOGGING_SECTION: &str = "logging";

/// Location of the configuration file: `<config dir>/hotpush/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hotpush")
        .join("config.ini")
}

/// `[updates]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatesSection {
    pub root_url: Option<String>,
    pub versions_dir: Option<PathBuf>,
    pub initial_bundle_dir: Option<PathBuf>,
    pub preferences_file: Option<PathBuf>,
    pub startup_timeout_secs: Option<u64>,
    pub max_requests_per_host: Option<usize>,
    pub platform: Option<String>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSection {
    pub filter: Option<String>,
}

/// Parsed configuration file. Absent keys stay `None` and fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub updates: UpdatesSection,
    pub logging: LoggingSection,
}

impl ConfigFile {
    /// Load from [`config_file_path`]. A missing file yields the defaults.
    pub fn load() -> UpdateResult<Self> {
        let path = config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> UpdateResult<Self> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| UpdateError::Config(format!("{}: {}", path.display(), e)))?;

        let get = |section: &str, key: &str| -> Option<String> {
            ini.section(Some(section))
                .and_then(|s| s.get(key))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            updates: UpdatesSection {
                root_url: get(UPDATES_SECTION, "root_url"),
                versions_dir: get(UPDATES_SECTION, "versions_dir").map(PathBuf::from),
                initial_bundle_dir: get(UPDATES_SECTION, "initial_bundle_dir").map(PathBuf::from),
                preferences_file: get(UPDATES_SECTION, "preferences_file").map(PathBuf::from),
                startup_timeout_secs: parse_opt(get(UPDATES_SECTION, "startup_timeout_secs"), "startup_timeout_secs")?,
                max_requests_per_host: parse_opt(get(UPDATES_SECTION, "max_requests_per_host"), "max_requests_per_host")?,
                platform: get(UPDATES_SECTION, "platform"),
            },
            logging: LoggingSection {
                filter: get(LOGGING_SECTION, "filter"),
            },
        })
    }

    /// Write to [`config_file_path`].
    pub fn save(&self) -> UpdateResult<()> {
        self.save_to(&config_file_path())
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> UpdateResult<()> {
        let mut ini = Ini::new();
        {
            let mut section = ini.with_section(Some(UPDATES_SECTION));
            if let Some(v) = &self.updates.root_url {
                section.set("root_url", v.as_str());
            }
            if let Some(v) = &self.updates.versions_dir {
                section.set("versions_dir", v.display().to_string());
            }
            if let Some(v) = &self.updates.initial_bundle_dir {
                section.set("initial_bundle_dir", v.display().to_string());
            }
            if let Some(v) = &self.updates.preferences_file {
                section.set("preferences_file", v.display().to_string());
            }
            if let Some(v) = self.updates.startup_timeout_secs {
                section.set("startup_timeout_secs", v.to_string());
            }
            if let Some(v) = self.updates.max_requests_per_host {
                section.set("max_requests_per_host", v.to_string());
            }
            if let Some(v) = &self.updates.platform {
                section.set("platform", v.as_str());
            }
        }
        if let Some(filter) = &self.logging.filter {
            ini.with_section(Some(LOGGING_SECTION))
                .set("filter", filter.as_str());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| UpdateError::directory_io("create directory", parent, e))?;
        }
        ini.write_to_file(path)
            .map_err(|e| UpdateError::directory_io("write config", path, e))
    }

    /// Build runtime settings, filling gaps with defaults.
    pub fn to_update_config(&self) -> UpdateConfig {
        let mut config = match &self.updates.versions_dir {
            Some(dir) => UpdateConfig::new(dir.clone()),
            None => UpdateConfig::default(),
        };
        if let Some(secs) = self.updates.startup_timeout_secs {
            config = config.with_startup_timeout(Duration::from_secs(secs));
        }
        if let Some(max) = self.updates.max_requests_per_host {
            config = config.with_max_requests_per_host(max);
        }
        if let Some(platform) = &self.updates.platform {
            config = config.with_platform(platform.clone());
        }
        config
    }
}

fn parse_opt<T: FromStr>(value: Option<String>, key: &str) -> UpdateResult<Option<T>> {
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| UpdateError::Config(format!("invalid value '{}' for {}", v, key)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_through_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let config = ConfigFile {
            updates: UpdatesSection {
                root_url: Some("https://app.example.com/".to_string()),
                versions_dir: Some(PathBuf::from("/data/versions")),
                startup_timeout_secs: Some(15),
                max_requests_per_host: Some(3),
                ..Default::default()
            },
            logging: LoggingSection {
                filter: Some("hotpush=debug".to_string()),
            },
        };

        config.save_to(&path).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_to_update_config() {
        let config = ConfigFile {
            updates: UpdatesSection {
                versions_dir: Some(PathBuf::from("/v")),
                startup_timeout_secs: Some(7),
                platform: Some("ios".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let settings = config.to_update_config();
        assert_eq!(settings.versions_dir, PathBuf::from("/v"));
        assert_eq!(settings.startup_timeout, Duration::from_secs(7));
        assert_eq!(settings.platform, "ios");
        assert_eq!(settings.max_requests_per_host, 6);
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[updates]\nstartup_timeout_secs = soon\n").unwrap();

        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(UpdateError::Config(_))
        ));
    }
}
