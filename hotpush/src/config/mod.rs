//! Configuration for hotpush.
//!
//! - [`UpdateConfig`]: typed runtime settings passed to the lifecycle controller
//! - [`ConfigFile`]: the on-disk INI file the CLI reads them from
//! - [`ConfigKey`]: `section.key` addressing for single settings

mod file;
mod keys;
mod settings;

pub use file::{config_file_path, ConfigFile, LoggingSection, UpdatesSection};
pub use keys::ConfigKey;
pub use settings::{
    UpdateConfig, DEFAULT_HTTP_TIMEOUT, DEFAULT_MAX_REQUESTS_PER_HOST, DEFAULT_PLATFORM,
    DEFAULT_STARTUP_TIMEOUT,
};
