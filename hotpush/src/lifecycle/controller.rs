//! Version lifecycle controller.

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use super::preferences::PreferenceStore;
use super::state::VersionState;
use super::watchdog::StartupWatchdog;
use super::{LifecycleEvent, ShellHost};
use crate::bundle::{strip_query, AssetBundle};
use crate::config::UpdateConfig;
use crate::error::{UpdateError, UpdateResult};
use crate::manager::{BundleManager, ExpectedOrigin, HttpTransport, ManagerDelegate};
use crate::manifest::AssetManifest;

/// Path under the root URL that serves manifests and assets.
pub const UPDATE_PATH: &str = "__cordova/";

/// Path that never falls back to the index document.
const FAVICON_PATH: &str = "/favicon.ico";

const EVENT_CHANNEL_CAPACITY: usize = 16;

struct ActiveBundles {
    current: Arc<AssetBundle>,
    pending: Option<Arc<AssetBundle>>,
}

/// Tracks which version is served, which one is next, and which ones failed.
///
/// ```text
///   downloaded ──► pending ──activate()──► current ──startup_did_complete()──► last known good
///                                             │
///                                             └── watchdog expires ──► blacklisted,
///                                                 revert target becomes pending, host reloads
/// ```
pub struct VersionLifecycle {
    config: UpdateConfig,
    manager: Arc<BundleManager>,
    state: VersionState,
    host: Arc<dyn ShellHost>,
    bundles: Mutex<ActiveBundles>,
    watchdog: StartupWatchdog,
    events: broadcast::Sender<LifecycleEvent>,
    this: Weak<VersionLifecycle>,
}

impl VersionLifecycle {
    /// Set up the lifecycle for `initial_bundle`.
    ///
    /// When the initial bundle's version differs from the one seen on the
    /// previous run, the app itself was updated: all downloaded versions are
    /// deleted and the persisted state is reset. The current bundle is then
    /// the last downloaded version if it is still on disk, else the initial
    /// bundle.
    pub fn initialize(
        config: UpdateConfig,
        initial_bundle: Arc<AssetBundle>,
        transport: Arc<dyn HttpTransport>,
        preferences: Arc<dyn PreferenceStore>,
        host: Arc<dyn ShellHost>,
    ) -> UpdateResult<Arc<Self>> {
        let state = VersionState::new(preferences);

        // Downloaded bundles inherit the key names of the initial bundle.
        let initial_bundle = if *initial_bundle.runtime_config_keys() == config.runtime_config_keys
        {
            initial_bundle
        } else {
            Arc::new(initial_bundle.rekeyed(config.runtime_config_keys.clone()))
        };

        let initial_version = initial_bundle.version().to_string();
        if state.last_seen_initial_version().as_deref() != Some(initial_version.as_str()) {
            info!(
                version = %initial_version,
                "Detected new bundled version, removing downloaded versions"
            );
            match std::fs::remove_dir_all(&config.versions_dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    path = %config.versions_dir.display(),
                    error = %e,
                    "Could not remove versions directory"
                ),
            }
            state.reset();
        }
        state.set_last_seen_initial_version(Some(&initial_version));

        let manager = Arc::new(BundleManager::new(
            config.clone(),
            Arc::clone(&initial_bundle),
            transport,
        )?);

        let current = state
            .last_downloaded_version()
            .and_then(|v| manager.downloaded_bundle(&v))
            .unwrap_or_else(|| Arc::clone(&initial_bundle));
        info!(version = %current.version(), "Initialized asset bundles");

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Arc::new_cyclic(|this: &Weak<Self>| {
            let delegate: Weak<dyn ManagerDelegate> = this.clone();
            manager.set_delegate(delegate);
            Self {
                config,
                manager,
                state,
                host,
                bundles: Mutex::new(ActiveBundles {
                    current,
                    pending: None,
                }),
                watchdog: StartupWatchdog::new(),
                events,
                this: this.clone(),
            }
        }))
    }

    /// Receive lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// The bundle being served.
    pub fn current_bundle(&self) -> Arc<AssetBundle> {
        Arc::clone(&self.bundles.lock().current)
    }

    /// The bundle that becomes current on the next activation.
    pub fn pending_bundle(&self) -> Option<Arc<AssetBundle>> {
        self.bundles.lock().pending.clone()
    }

    /// The bundle manager.
    pub fn manager(&self) -> &Arc<BundleManager> {
        &self.manager
    }

    /// Persisted state.
    pub fn state(&self) -> &VersionState {
        &self.state
    }

    /// Whether the startup watchdog is running.
    pub fn is_watchdog_armed(&self) -> bool {
        self.watchdog.is_armed()
    }

    /// Make the pending bundle current and start the startup watchdog.
    ///
    /// Called by the host when the page is about to be (re)loaded.
    pub fn activate(&self) {
        let current = {
            let mut bundles = self.bundles.lock();
            if let Some(pending) = bundles.pending.take() {
                bundles.current = pending;
            }
            Arc::clone(&bundles.current)
        };
        info!(version = %current.version(), "Serving asset bundle");

        // A bundle without runtime configuration keeps the last known origin.
        if let Some(app_id) = current.app_id() {
            self.state.set_app_id(Some(app_id));
        }
        if let Some(root_url) = current.root_url() {
            self.state.set_root_url(Some(root_url));
        }
        self.state.set_cordova_compatibility_version(
            current.cordova_compatibility_version(&self.config.platform),
        );

        let this = self.this.clone();
        self.watchdog.arm(self.config.startup_timeout, move || {
            if let Some(lifecycle) = this.upgrade() {
                warn!("App startup timed out, reverting to last known good version");
                lifecycle.revert_to_last_known_good();
            }
        });
    }

    /// The app started successfully with the current bundle.
    ///
    /// Stops the watchdog, records the current version as last known good,
    /// and deletes downloaded versions that are neither current nor pending.
    /// Returns the number of versions removed.
    pub async fn startup_did_complete(&self) -> usize {
        self.watchdog.cancel();

        let (current, pending) = {
            let bundles = self.bundles.lock();
            (
                bundles.current.version().to_string(),
                bundles.pending.as_ref().map(|b| b.version().to_string()),
            )
        };
        self.state.set_last_known_good_version(Some(&current));
        info!(version = %current, "Startup completed");

        let manager = Arc::clone(&self.manager);
        let pruned = tokio::task::spawn_blocking(move || {
            let mut keep = vec![current.as_str()];
            keep.extend(pending.as_deref());
            manager.remove_all_except_versions(&keep)
        })
        .await;

        match pruned {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "Pruning downloaded versions failed");
                0
            }
        }
    }

    /// Blacklist the current version and schedule a reload of a safe one.
    ///
    /// The target is the last known good version when it is still on disk and
    /// is not the current version; otherwise the initial bundle, unless that
    /// is what is being served. Without a target nothing is reloaded.
    pub fn revert_to_last_known_good(&self) {
        let current = self.current_bundle();
        self.state.add_blacklisted_version(current.version());
        warn!(version = %current.version(), "Blacklisted version");

        let initial = self.manager.initial_bundle();
        let target = self
            .state
            .last_known_good_version()
            .filter(|v| v != current.version())
            .and_then(|v| self.manager.downloaded_bundle(&v))
            .or_else(|| {
                (current.version() != initial.version()).then(|| Arc::clone(initial))
            });

        let Some(target) = target else {
            warn!(version = %current.version(), "No version to revert to");
            return;
        };

        info!(from = %current.version(), to = %target.version(), "Reverting");
        self.bundles.lock().pending = Some(Arc::clone(&target));
        let _ = self.events.send(LifecycleEvent::RevertScheduled {
            from: current.version().to_string(),
            to: target.version().to_string(),
        });
        self.host.reload();
    }

    /// Stop the watchdog while the app is suspended.
    pub fn application_did_enter_background(&self) {
        if self.watchdog.cancel() {
            debug!("Startup watchdog stopped for background");
        }
    }

    /// Base URL updates are fetched from: `<root url>/__cordova/`.
    ///
    /// The root URL comes from the current bundle's runtime configuration,
    /// falling back to the persisted one.
    pub fn update_base_url(&self) -> UpdateResult<Url> {
        let root = self
            .current_bundle()
            .root_url()
            .map(str::to_string)
            .or_else(|| self.state.root_url())
            .ok_or(UpdateError::MissingRootUrl)?;
        Self::base_url_for(&root)
    }

    /// Update base URL for an explicit root URL.
    pub fn base_url_for(root_url: &str) -> UpdateResult<Url> {
        let normalized = if root_url.ends_with('/') {
            root_url.to_string()
        } else {
            format!("{}/", root_url)
        };
        Url::parse(&normalized)
            .and_then(|u| u.join(UPDATE_PATH))
            .map_err(|e| UpdateError::InvalidUrl {
                url: normalized.clone(),
                reason: e.to_string(),
            })
    }

    /// Check the origin for a new version.
    ///
    /// Only a missing or invalid root URL is returned as an error; download
    /// results arrive as [`LifecycleEvent`]s.
    pub async fn check_for_updates(&self) -> UpdateResult<()> {
        let base_url = self.update_base_url()?;
        self.manager.check_for_updates(&base_url).await;
        Ok(())
    }

    /// File the host should serve for `url_path`.
    ///
    /// Unknown paths get the index document so client-side routes work,
    /// except for the favicon.
    pub fn file_for_url_path(&self, url_path: &str) -> Option<PathBuf> {
        let path = strip_query(url_path);
        let current = self.current_bundle();

        if let Some(file) = current.file_for_url_path(path) {
            return Some(file);
        }
        if path == FAVICON_PATH {
            return None;
        }
        current
            .index_file()
            .map(|index| current.file_for_asset(index))
    }

    fn notify_error(&self, error: UpdateError) {
        warn!(error = %error, "Update failed");
        let _ = self
            .events
            .send(LifecycleEvent::DownloadFailed(error.to_string()));
    }
}

impl ManagerDelegate for VersionLifecycle {
    fn should_download(&self, manifest: &AssetManifest) -> bool {
        let version = manifest.version.as_str();
        {
            let bundles = self.bundles.lock();
            if bundles.current.version() == version {
                info!(version, "Skipping download of current version");
                return false;
            }
            if bundles
                .pending
                .as_ref()
                .is_some_and(|p| p.version() == version)
            {
                info!(version, "Skipping download of pending version");
                return false;
            }
        }

        if self.state.is_blacklisted(version) {
            self.notify_error(UpdateError::download_failure(
                version,
                "skipping download of blacklisted version",
            ));
            return false;
        }

        if let Some(expected) = self.state.cordova_compatibility_version() {
            let offered = manifest.cordova_compatibility_version(&self.config.platform);
            if offered != Some(expected.as_str()) {
                self.notify_error(UpdateError::download_failure(
                    version,
                    "skipping download because the native code version changed and may be incompatible",
                ));
                return false;
            }
        }

        true
    }

    fn on_finished_downloading(&self, bundle: Arc<AssetBundle>) {
        let version = bundle.version().to_string();
        self.state.set_last_downloaded_version(Some(&version));
        self.bundles.lock().pending = Some(bundle);
        info!(version = %version, "New version ready");
        let _ = self.events.send(LifecycleEvent::NewVersionReady(version));
    }

    fn on_error(&self, error: UpdateError) {
        self.notify_error(error);
    }

    fn expected_origin(&self) -> ExpectedOrigin {
        ExpectedOrigin {
            app_id: self.state.app_id(),
            root_url: self.state.root_url(),
        }
    }
}
