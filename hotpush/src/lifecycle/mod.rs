//! Version lifecycle: which bundle is served, which is next, which failed.
//!
//! The [`VersionLifecycle`] controller is the bundle manager's delegate. It
//! accepts or rejects offered versions, holds a finished download as pending
//! until the host reloads, and guards every activation with a startup
//! watchdog. If the app does not report a successful startup in time, the
//! version is blacklisted and the host is asked to reload a safe version.
//!
//! The host is reached through two seams:
//! - [`ShellHost`]: the native shell's page reload
//! - [`PreferenceStore`]: persistent key-value storage

mod controller;
mod preferences;
mod state;
mod watchdog;

pub use controller::{VersionLifecycle, UPDATE_PATH};
pub use preferences::{JsonFilePreferences, MemoryPreferences, PreferenceStore};
pub use state::{
    VersionState, APP_ID_KEY, BLACKLISTED_VERSIONS_KEY, CORDOVA_COMPATIBILITY_VERSION_KEY,
    LAST_DOWNLOADED_VERSION_KEY, LAST_KNOWN_GOOD_VERSION_KEY, LAST_SEEN_INITIAL_VERSION_KEY,
    ROOT_URL_KEY,
};
pub use watchdog::StartupWatchdog;

/// The native shell hosting the web view.
pub trait ShellHost: Send + Sync {
    /// Reload the page so the pending bundle gets activated.
    ///
    /// The host is expected to call
    /// [`VersionLifecycle::activate`] before the new page loads.
    fn reload(&self);
}

/// Notifications for observers of the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A version finished downloading and will be served after the next reload.
    NewVersionReady(String),
    /// An update check or download failed, or an offered version was rejected.
    DownloadFailed(String),
    /// The startup watchdog fired and a reload to `to` was requested.
    RevertScheduled { from: String, to: String },
}
