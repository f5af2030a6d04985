//! Typed view of the persisted lifecycle state.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use super::preferences::PreferenceStore;
use crate::error::UpdateResult;

pub const APP_ID_KEY: &str = "appId";
pub const ROOT_URL_KEY: &str = "rootUrl";
pub const CORDOVA_COMPATIBILITY_VERSION_KEY: &str = "cordovaCompatibilityVersion";
pub const LAST_DOWNLOADED_VERSION_KEY: &str = "lastDownloadedVersion";
pub const LAST_SEEN_INITIAL_VERSION_KEY: &str = "lastSeenInitialVersion";
pub const LAST_KNOWN_GOOD_VERSION_KEY: &str = "lastKnownGoodVersion";
pub const BLACKLISTED_VERSIONS_KEY: &str = "blacklistedVersions";

const ALL_KEYS: [&str; 7] = [
    APP_ID_KEY,
    ROOT_URL_KEY,
    CORDOVA_COMPATIBILITY_VERSION_KEY,
    LAST_DOWNLOADED_VERSION_KEY,
    LAST_SEEN_INITIAL_VERSION_KEY,
    LAST_KNOWN_GOOD_VERSION_KEY,
    BLACKLISTED_VERSIONS_KEY,
];

/// Persisted lifecycle state.
///
/// Write failures are logged and otherwise ignored: the in-process state
/// machine keeps running even if the store is unwritable.
#[derive(Clone)]
pub struct VersionState {
    store: Arc<dyn PreferenceStore>,
}

impl VersionState {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn app_id(&self) -> Option<String> {
        self.store.get_string(APP_ID_KEY)
    }

    pub fn set_app_id(&self, value: Option<&str>) {
        self.write_string(APP_ID_KEY, value);
    }

    pub fn root_url(&self) -> Option<String> {
        self.store.get_string(ROOT_URL_KEY)
    }

    pub fn set_root_url(&self, value: Option<&str>) {
        self.write_string(ROOT_URL_KEY, value);
    }

    pub fn cordova_compatibility_version(&self) -> Option<String> {
        self.store.get_string(CORDOVA_COMPATIBILITY_VERSION_KEY)
    }

    pub fn set_cordova_compatibility_version(&self, value: Option<&str>) {
        self.write_string(CORDOVA_COMPATIBILITY_VERSION_KEY, value);
    }

    pub fn last_downloaded_version(&self) -> Option<String> {
        self.store.get_string(LAST_DOWNLOADED_VERSION_KEY)
    }

    pub fn set_last_downloaded_version(&self, value: Option<&str>) {
        self.write_string(LAST_DOWNLOADED_VERSION_KEY, value);
    }

    pub fn last_seen_initial_version(&self) -> Option<String> {
        self.store.get_string(LAST_SEEN_INITIAL_VERSION_KEY)
    }

    pub fn set_last_seen_initial_version(&self, value: Option<&str>) {
        self.write_string(LAST_SEEN_INITIAL_VERSION_KEY, value);
    }

    pub fn last_known_good_version(&self) -> Option<String> {
        self.store.get_string(LAST_KNOWN_GOOD_VERSION_KEY)
    }

    pub fn set_last_known_good_version(&self, value: Option<&str>) {
        self.write_string(LAST_KNOWN_GOOD_VERSION_KEY, value);
    }

    pub fn blacklisted_versions(&self) -> BTreeSet<String> {
        self.store.get_string_set(BLACKLISTED_VERSIONS_KEY)
    }

    pub fn is_blacklisted(&self, version: &str) -> bool {
        self.blacklisted_versions().contains(version)
    }

    /// Add `version` to the blacklist.
    pub fn add_blacklisted_version(&self, version: &str) {
        let mut versions = self.blacklisted_versions();
        if versions.insert(version.to_string()) {
            log_failure(
                BLACKLISTED_VERSIONS_KEY,
                self.store.set_string_set(BLACKLISTED_VERSIONS_KEY, &versions),
            );
        }
    }

    /// Forget everything.
    pub fn reset(&self) {
        for key in ALL_KEYS {
            log_failure(key, self.store.remove(key));
        }
    }

    fn write_string(&self, key: &str, value: Option<&str>) {
        log_failure(key, self.store.set_string(key, value));
    }
}

fn log_failure(key: &str, result: UpdateResult<()>) {
    if let Err(e) = result {
        warn!(key, error = %e, "Could not persist lifecycle state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::MemoryPreferences;

    fn state() -> VersionState {
        VersionState::new(Arc::new(MemoryPreferences::new()))
    }

    #[test]
    fn test_blacklist_accumulates() {
        let state = state();
        state.add_blacklisted_version("v2");
        state.add_blacklisted_version("v3");
        state.add_blacklisted_version("v2");

        assert!(state.is_blacklisted("v2"));
        assert!(state.is_blacklisted("v3"));
        assert_eq!(state.blacklisted_versions().len(), 2);
    }

    #[test]
    fn test_reset_clears_every_key() {
        let state = state();
        state.set_app_id(Some("app"));
        state.set_root_url(Some("https://example.com/"));
        state.set_cordova_compatibility_version(Some("c1"));
        state.set_last_downloaded_version(Some("v2"));
        state.set_last_seen_initial_version(Some("v1"));
        state.set_last_known_good_version(Some("v2"));
        state.add_blacklisted_version("v3");

        state.reset();

        assert_eq!(state.app_id(), None);
        assert_eq!(state.root_url(), None);
        assert_eq!(state.cordova_compatibility_version(), None);
        assert_eq!(state.last_downloaded_version(), None);
        assert_eq!(state.last_seen_initial_version(), None);
        assert_eq!(state.last_known_good_version(), None);
        assert!(state.blacklisted_versions().is_empty());
    }
}
