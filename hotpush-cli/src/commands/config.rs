//! `config get`, `config set`, `config list`, and `config path`.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use hotpush::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., updates.root_url)
        key: String,
    },

    /// Set a configuration value (an empty value clears it)
    Set {
        /// Configuration key in format section.key (e.g., updates.root_url)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand against `path`, or the default file location.
pub fn run(command: ConfigCommands, path: Option<&Path>) -> Result<(), CliError> {
    let mut document = ConfigDocument::open(path)?;

    match command {
        ConfigCommands::Get { key } => {
            let key = lookup(&key)?;
            println!("{}", display_value(&key.get(&document.file)));
        }
        ConfigCommands::Set { key, value } => {
            let key = lookup(&key)?;
            key.set(&mut document.file, &value)
                .map_err(|e| CliError::Config(e.to_string()))?;
            document.file.save_to(&document.path)?;
            println!("{} = {}", key.name(), display_value(&key.get(&document.file)));
        }
        ConfigCommands::List => {
            println!("# {}", document.path.display());
            let width = ConfigKey::all()
                .iter()
                .map(|k| k.name().len())
                .max()
                .unwrap_or(0);
            for key in ConfigKey::all() {
                println!(
                    "{:width$} = {}",
                    key.name(),
                    display_value(&key.get(&document.file)),
                    width = width
                );
            }
        }
        ConfigCommands::Path => println!("{}", document.path.display()),
    }
    Ok(())
}

/// The configuration file being viewed or edited.
struct ConfigDocument {
    path: PathBuf,
    file: ConfigFile,
}

impl ConfigDocument {
    /// A missing file reads as all defaults.
    fn open(path: Option<&Path>) -> Result<Self, CliError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
        let file = if path.exists() {
            ConfigFile::load_from(&path)?
        } else {
            ConfigFile::default()
        };
        Ok(Self { path, file })
    }
}

fn lookup(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Run 'hotpush config list' for the available keys.",
            key
        ))
    })
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_writes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        run(
            ConfigCommands::Set {
                key: "updates.platform".to_string(),
                value: "ios".to_string(),
            },
            Some(&path),
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.updates.platform.as_deref(), Some("ios"));
    }

    #[test]
    fn test_unknown_key() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        let result = run(ConfigCommands::Get { key: "nope".to_string() }, Some(&path));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_missing_file_reads_as_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.ini");

        let document = ConfigDocument::open(Some(&path)).unwrap();
        assert_eq!(document.path, path);
        assert!(document.file.updates.platform.is_none());

        run(ConfigCommands::List, Some(&path)).unwrap();
        assert!(!path.exists());
    }
}
