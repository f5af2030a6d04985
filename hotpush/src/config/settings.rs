//! Runtime settings for update checks and version management.

use std::path::PathBuf;
use std::time::Duration;

use crate::bundle::RuntimeConfigKeys;

/// Default time the app has to signal startup completion after a reload.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(20);

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default limit of simultaneous asset requests against the origin.
pub const DEFAULT_MAX_REQUESTS_PER_HOST: usize = 6;

/// Default platform used to look up compatibility versions.
pub const DEFAULT_PLATFORM: &str = "android";

/// Settings for the update pipeline.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Directory holding one subdirectory per downloaded version.
    pub versions_dir: PathBuf,

    /// How long the app has to call `startup_did_complete` after activation
    /// before the version is blacklisted and rolled back.
    pub startup_timeout: Duration,

    /// HTTP request timeout.
    pub http_timeout: Duration,

    /// Maximum concurrent asset requests.
    pub max_requests_per_host: usize,

    /// Platform key into the manifest's `cordovaCompatibilityVersions`.
    pub platform: String,

    /// Runtime configuration key names.
    pub runtime_config_keys: RuntimeConfigKeys,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            versions_dir: std::env::temp_dir().join("hotpush").join("versions"),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            max_requests_per_host: DEFAULT_MAX_REQUESTS_PER_HOST,
            platform: DEFAULT_PLATFORM.to_string(),
            runtime_config_keys: RuntimeConfigKeys::default(),
        }
    }
}

impl UpdateConfig {
    /// Create a configuration storing versions in `versions_dir`.
    pub fn new(versions_dir: PathBuf) -> Self {
        Self {
            versions_dir,
            ..Default::default()
        }
    }

    /// Set the startup watchdog timeout.
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Set the HTTP timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Set the maximum concurrent asset requests (minimum 1).
    pub fn with_max_requests_per_host(mut self, max: usize) -> Self {
        self.max_requests_per_host = max.max(1);
        self
    }

    /// Set the platform used for compatibility checks.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Set the runtime configuration key names.
    pub fn with_runtime_config_keys(mut self, keys: RuntimeConfigKeys) -> Self {
        self.runtime_config_keys = keys;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UpdateConfig::default();
        assert_eq!(config.startup_timeout, Duration::from_secs(20));
        assert_eq!(config.max_requests_per_host, 6);
        assert_eq!(config.platform, "android");
        assert_eq!(config.runtime_config_keys.root_url, "ROOT_URL");
    }

    #[test]
    fn test_builder_pattern() {
        let config = UpdateConfig::new(PathBuf::from("/data/versions"))
            .with_startup_timeout(Duration::from_secs(5))
            .with_http_timeout(Duration::from_secs(60))
            .with_max_requests_per_host(0)
            .with_platform("ios");

        assert_eq!(config.versions_dir, PathBuf::from("/data/versions"));
        assert_eq!(config.startup_timeout, Duration::from_secs(5));
        assert_eq!(config.http_timeout, Duration::from_secs(60));
        assert_eq!(config.max_requests_per_host, 1);
        assert_eq!(config.platform, "ios");
    }
}
