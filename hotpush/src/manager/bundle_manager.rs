//! Update checks, staged downloads, and promotion of downloaded versions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use url::Url;

use super::download::{BundleDownloader, DownloadOutcome};
use super::layout::VersionsLayout;
use super::traits::{HttpTransport, ManagerDelegate};
use crate::bundle::{Asset, AssetBundle};
use crate::config::UpdateConfig;
use crate::error::{UpdateError, UpdateResult};
use crate::manifest::{parse_manifest, AssetManifest, MANIFEST_FILENAME, MANIFEST_URL_PATH};

#[derive(Default)]
struct ManagerState {
    downloaded: HashMap<String, Arc<AssetBundle>>,
    downloader: Option<Arc<BundleDownloader>>,
    partial: Option<Arc<AssetBundle>>,
}

/// Owns the set of downloaded versions and fetches new ones.
///
/// Results of [`check_for_updates`](Self::check_for_updates) are reported to
/// the [`ManagerDelegate`], never returned, so a failed check has exactly one
/// place it shows up.
///
/// The `Downloading` directory belongs to one download at a time. Deciding
/// what to download, staging, registering the downloader and promoting all
/// happen under `staging`; only the transfers themselves run outside it.
pub struct BundleManager {
    config: UpdateConfig,
    layout: VersionsLayout,
    initial_bundle: Arc<AssetBundle>,
    transport: Arc<dyn HttpTransport>,
    delegate: RwLock<Option<Weak<dyn ManagerDelegate>>>,
    state: Mutex<ManagerState>,
    staging: AsyncMutex<()>,
}

impl BundleManager {
    /// Create a manager over `config.versions_dir`.
    ///
    /// Every promoted version directory is loaded as a bundle diffed against
    /// `initial_bundle`. Directories that fail to load are skipped.
    pub fn new(
        config: UpdateConfig,
        initial_bundle: Arc<AssetBundle>,
        transport: Arc<dyn HttpTransport>,
    ) -> UpdateResult<Self> {
        let layout = VersionsLayout::new(config.versions_dir.clone());
        layout.ensure_root()?;

        let mut downloaded = HashMap::new();
        for (name, path) in layout.version_directories()? {
            match AssetBundle::load(&path, Some(Arc::clone(&initial_bundle))) {
                Ok(bundle) => {
                    if bundle.version() != name {
                        warn!(
                            directory = %path.display(),
                            version = %bundle.version(),
                            "Version directory name does not match its manifest"
                        );
                    }
                    debug!(version = %bundle.version(), "Found downloaded version");
                    downloaded.insert(bundle.version().to_string(), Arc::new(bundle));
                }
                Err(e) => {
                    warn!(directory = %path.display(), error = %e, "Skipping unreadable version directory");
                }
            }
        }

        Ok(Self {
            config,
            layout,
            initial_bundle,
            transport,
            delegate: RwLock::new(None),
            state: Mutex::new(ManagerState {
                downloaded,
                ..Default::default()
            }),
            staging: AsyncMutex::new(()),
        })
    }

    /// Register the component that receives results.
    pub fn set_delegate(&self, delegate: Weak<dyn ManagerDelegate>) {
        *self.delegate.write() = Some(delegate);
    }

    fn delegate(&self) -> Option<Arc<dyn ManagerDelegate>> {
        self.delegate.read().as_ref().and_then(Weak::upgrade)
    }

    /// The bundle shipped with the application.
    pub fn initial_bundle(&self) -> &Arc<AssetBundle> {
        &self.initial_bundle
    }

    /// The versions directory.
    pub fn download_directory(&self) -> &std::path::Path {
        self.layout.root()
    }

    /// A downloaded bundle by version.
    pub fn downloaded_bundle(&self, version: &str) -> Option<Arc<AssetBundle>> {
        self.state.lock().downloaded.get(version).cloned()
    }

    /// Versions currently stored on disk, sorted.
    pub fn downloaded_versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.state.lock().downloaded.keys().cloned().collect();
        versions.sort();
        versions
    }

    /// Whether a download is in flight.
    pub fn is_downloading(&self) -> bool {
        self.state
            .lock()
            .downloader
            .as_ref()
            .is_some_and(|d| !d.is_canceled())
    }

    /// Fetch the manifest under `base_url` and download its version if needed.
    pub async fn check_for_updates(&self, base_url: &Url) {
        let (manifest, manifest_bytes) = match self.fetch_manifest(base_url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.report_error(e);
                return;
            }
        };
        let version = manifest.version.clone();

        let staging = self.staging.lock().await;

        if let Some(downloader) = &self.state.lock().downloader {
            if downloader.bundle().version() == version && !downloader.is_canceled() {
                debug!(version = %version, "Already downloading this version");
                return;
            }
        }

        let Some(delegate) = self.delegate() else {
            debug!("No delegate registered, ignoring manifest");
            return;
        };
        if !delegate.should_download(&manifest) {
            return;
        }

        if let Some(previous) = self.state.lock().downloader.take() {
            info!(
                version = %previous.bundle().version(),
                "Canceling download of superseded version"
            );
            previous.cancel();
        }

        if version == self.initial_bundle.version() {
            info!(version = %version, "Available version is the initial version");
            delegate.on_finished_downloading(Arc::clone(&self.initial_bundle));
            return;
        }

        if let Some(bundle) = self.downloaded_bundle(&version) {
            info!(version = %version, "Available version was downloaded before");
            delegate.on_finished_downloading(bundle);
            return;
        }

        let bundle = match self.stage_bundle(&manifest, &manifest_bytes).await {
            Ok(bundle) => bundle,
            Err(e) => {
                self.report_error(e);
                return;
            }
        };
        let downloader = self.start_download(bundle, base_url).await;
        drop(staging);

        if let Some(downloader) = downloader {
            self.run_download(downloader).await;
        }
    }

    async fn fetch_manifest(&self, base_url: &Url) -> UpdateResult<(AssetManifest, Vec<u8>)> {
        let url = base_url
            .join(MANIFEST_URL_PATH)
            .map_err(|e| UpdateError::InvalidUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;

        debug!(url = %url, "Checking for updates");
        let response = self.transport.get(&url).await?;
        if !response.is_success() {
            return Err(UpdateError::download_failure(
                url.as_str(),
                format!("non-success status code {} for asset manifest", response.status),
            ));
        }

        let bytes = response.bytes(&url).await?;
        let manifest = parse_manifest(&bytes)?;
        Ok((manifest, bytes))
    }

    /// Reset the staging directory and build the bundle to download into it.
    async fn stage_bundle(
        &self,
        manifest: &AssetManifest,
        manifest_bytes: &[u8],
    ) -> UpdateResult<Arc<AssetBundle>> {
        let has_partial = self.layout.prepare_staging().await?;

        let partial = if has_partial {
            match AssetBundle::load(
                self.layout.partial_download_dir(),
                Some(Arc::clone(&self.initial_bundle)),
            ) {
                Ok(bundle) => Some(Arc::new(bundle)),
                Err(e) => {
                    warn!(error = %e, "Could not load partially downloaded bundle");
                    None
                }
            }
        } else {
            None
        };
        self.state.lock().partial = partial;

        let downloading = self.layout.downloading_dir();
        let manifest_path = downloading.join(MANIFEST_FILENAME);
        tokio::fs::write(&manifest_path, manifest_bytes)
            .await
            .map_err(|e| UpdateError::directory_io("write manifest", &manifest_path, e))?;

        Ok(Arc::new(AssetBundle::new(
            downloading,
            manifest,
            Some(Arc::clone(&self.initial_bundle)),
        )))
    }

    /// Complete `bundle` in its directory and promote it.
    ///
    /// Assets with a reusable copy in a downloaded version or in the partial
    /// download are copied; only the rest are requested from `base_url`.
    pub async fn download_asset_bundle(&self, bundle: Arc<AssetBundle>, base_url: &Url) {
        let downloader = {
            let _staging = self.staging.lock().await;
            self.start_download(bundle, base_url).await
        };
        if let Some(downloader) = downloader {
            self.run_download(downloader).await;
        }
    }

    /// Fill `bundle` from local copies and register a downloader for the rest.
    ///
    /// Returns `None` when nothing is left to fetch, after the bundle has been
    /// finished or the error reported. Must be called under `staging`.
    async fn start_download(
        &self,
        bundle: Arc<AssetBundle>,
        base_url: &Url,
    ) -> Option<Arc<BundleDownloader>> {
        let missing = match self.reuse_cached_assets(&bundle).await {
            Ok(missing) => missing,
            Err(e) => {
                self.report_error(e);
                return None;
            }
        };

        if missing.is_empty() {
            debug!(version = %bundle.version(), "All assets available locally");
            self.finish_download(bundle).await;
            return None;
        }

        let origin = self
            .delegate()
            .map(|d| d.expected_origin())
            .unwrap_or_default();
        let downloader = Arc::new(BundleDownloader::new(
            Arc::clone(&bundle),
            base_url.clone(),
            missing,
            Arc::clone(&self.transport),
            self.config.max_requests_per_host,
            origin,
        ));
        self.state.lock().downloader = Some(Arc::clone(&downloader));
        Some(downloader)
    }

    /// Run a registered downloader and promote its bundle on success.
    async fn run_download(&self, downloader: Arc<BundleDownloader>) {
        let outcome = downloader.run().await;

        // A superseding check cancels under `staging` before touching the
        // staging directory, so the cancel flag is stable while it is held.
        let _staging = self.staging.lock().await;
        {
            let mut state = self.state.lock();
            if state
                .downloader
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &downloader))
            {
                state.downloader = None;
            }
        }

        let bundle = Arc::clone(downloader.bundle());
        match outcome {
            DownloadOutcome::Finished if !downloader.is_canceled() => {
                self.finish_download(bundle).await
            }
            DownloadOutcome::Failed(e) if !downloader.is_canceled() => self.report_error(e),
            _ => debug!(version = %bundle.version(), "Download canceled, discarding result"),
        }
    }

    async fn reuse_cached_assets(&self, bundle: &AssetBundle) -> UpdateResult<Vec<Asset>> {
        let sources: Vec<Arc<AssetBundle>> = {
            let state = self.state.lock();
            state
                .downloaded
                .values()
                .chain(state.partial.iter())
                .cloned()
                .collect()
        };

        let mut missing = Vec::new();
        for asset in bundle.own_assets() {
            let destination = bundle.file_for_asset(asset);
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| UpdateError::directory_io("create directory", parent, e))?;
            }

            match cached_copy(&sources, asset).await {
                Some(source) => {
                    tokio::fs::copy(&source, &destination)
                        .await
                        .map_err(|e| UpdateError::directory_io("copy file", &source, e))?;
                    debug!(url_path = %asset.url_path, from = %source.display(), "Reused cached asset");
                }
                None => missing.push(asset.clone()),
            }
        }
        Ok(missing)
    }

    async fn finish_download(&self, bundle: Arc<AssetBundle>) {
        let version = bundle.version().to_string();

        if bundle.is_stored_at(&self.layout.downloading_dir()) {
            match self.layout.promote(&version).await {
                Ok(directory) => bundle.move_to_directory(directory),
                Err(e) => {
                    self.report_error(e);
                    return;
                }
            }
        }

        let had_partial = {
            let mut state = self.state.lock();
            state.downloaded.insert(version.clone(), Arc::clone(&bundle));
            state.partial.take().is_some()
        };
        if had_partial {
            let partial = self.layout.partial_download_dir();
            if let Err(e) = tokio::fs::remove_dir_all(&partial).await {
                warn!(path = %partial.display(), error = %e, "Could not remove partial download");
            }
        }

        info!(version = %version, "Downloaded version is ready");
        match self.delegate() {
            Some(delegate) => delegate.on_finished_downloading(bundle),
            None => debug!(version = %version, "No delegate registered for finished download"),
        }
    }

    /// Delete every downloaded version except `version_to_keep`.
    ///
    /// Returns the number of versions removed. Directories that cannot be
    /// deleted are logged and dropped from the known set anyway.
    pub fn remove_all_except(&self, version_to_keep: Option<&str>) -> usize {
        self.remove_all_except_versions(version_to_keep.as_slice())
    }

    /// Delete every downloaded version not listed in `versions_to_keep`.
    pub fn remove_all_except_versions(&self, versions_to_keep: &[&str]) -> usize {
        let removed: Vec<Arc<AssetBundle>> = {
            let mut state = self.state.lock();
            let doomed: Vec<String> = state
                .downloaded
                .keys()
                .filter(|v| !versions_to_keep.contains(&v.as_str()))
                .cloned()
                .collect();
            doomed
                .iter()
                .filter_map(|v| state.downloaded.remove(v))
                .collect()
        };

        for bundle in &removed {
            info!(version = %bundle.version(), "Removing downloaded version");
            VersionsLayout::remove_best_effort(&bundle.directory());
        }
        removed.len()
    }

    fn report_error(&self, error: UpdateError) {
        match self.delegate() {
            Some(delegate) => delegate.on_error(error),
            None => warn!(error = %error, "Update error with no delegate registered"),
        }
    }
}

/// Find an on-disk copy of `asset` in any of `sources`.
async fn cached_copy(sources: &[Arc<AssetBundle>], asset: &Asset) -> Option<PathBuf> {
    for source in sources {
        if let Some(cached) = source.cached_asset_for_url_path(&asset.url_path, asset.hash.as_deref()) {
            let path = source.file_for_asset(cached);
            if tokio::fs::metadata(&path).await.is_ok() {
                return Some(path);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    use serde_json::json;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    use crate::bundle::index_html_with_config;
    use crate::manager::traits::{BoxFuture, HttpResponse};

    // ========================================================================
    // Fixtures
    // ========================================================================

    fn manifest_json(version: &str, files: &[(&str, &str)]) -> String {
        let entries: Vec<_> = files
            .iter()
            .map(|(path, hash)| {
                json!({
                    "where": "client",
                    "path": path,
                    "url": format!("/{}?hash={}", path, hash),
                    "type": "js",
                    "cacheable": true,
                    "hash": hash,
                })
            })
            .collect();
        json!({"format": "web-program-pre1", "version": version, "manifest": entries}).to_string()
    }

    fn index_html(version: &str) -> String {
        index_html_with_config(&json!({
            "appId": "app",
            "ROOT_URL": "https://example.com/",
            "autoupdateVersionCordova": version,
        }))
    }

    fn write_bundle_dir(dir: &Path, version: &str, files: &[(&str, &str)]) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(MANIFEST_FILENAME), manifest_json(version, files)).unwrap();
        fs::write(dir.join("index.html"), index_html(version)).unwrap();
        for (path, hash) in files {
            fs::write(dir.join(path), format!("content {}", hash)).unwrap();
        }
    }

    /// Serves a fixed set of paths and records every request.
    ///
    /// One path can be held: its first request waits until released.
    struct ScriptedTransport {
        routes: Mutex<HashMap<String, String>>,
        requests: Mutex<Vec<String>>,
        held: Mutex<Option<(String, Arc<Notify>)>>,
    }

    impl ScriptedTransport {
        fn new(routes: &[(&str, String)]) -> Arc<Self> {
            Arc::new(Self {
                routes: Mutex::new(
                    routes
                        .iter()
                        .map(|(path, body)| (path.to_string(), body.clone()))
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
                held: Mutex::new(None),
            })
        }

        fn set_route(&self, path: &str, body: String) {
            self.routes.lock().insert(path.to_string(), body);
        }

        /// Hold the first request for `path` until the returned handle is notified.
        fn hold_first(&self, path: &str) -> Arc<Notify> {
            let release = Arc::new(Notify::new());
            *self.held.lock() = Some((path.to_string(), Arc::clone(&release)));
            release
        }

        fn requested_paths(&self) -> Vec<String> {
            self.requests.lock().clone()
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, UpdateResult<HttpResponse>> {
            Box::pin(async move {
                self.requests.lock().push(url.path().to_string());

                let release = {
                    let mut held = self.held.lock();
                    match held.as_ref() {
                        Some((path, _)) if path == url.path() => held.take().map(|(_, r)| r),
                        _ => None,
                    }
                };
                if let Some(release) = release {
                    release.notified().await;
                }

                let body = self.routes.lock().get(url.path()).cloned();
                Ok(match body {
                    Some(body) => HttpResponse::from_bytes(200, None, body),
                    None => HttpResponse::from_bytes(404, None, ""),
                })
            })
        }
    }

    struct RecordingDelegate {
        accept: bool,
        finished: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
    }

    impl RecordingDelegate {
        fn new(accept: bool) -> Arc<Self> {
            Arc::new(Self {
                accept,
                finished: Mutex::new(Vec::new()),
                errors: Mutex::new(Vec::new()),
            })
        }
    }

    impl ManagerDelegate for RecordingDelegate {
        fn should_download(&self, _manifest: &AssetManifest) -> bool {
            self.accept
        }

        fn on_finished_downloading(&self, bundle: Arc<AssetBundle>) {
            self.finished.lock().push(bundle.version().to_string());
        }

        fn on_error(&self, error: UpdateError) {
            self.errors.lock().push(error.to_string());
        }
    }

    struct Fixture {
        _temp: TempDir,
        versions_dir: PathBuf,
        initial: Arc<AssetBundle>,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let initial_dir = temp.path().join("www");
        write_bundle_dir(&initial_dir, "v1", &[("app.js", "aaa"), ("lib.js", "bbb")]);
        let initial = Arc::new(AssetBundle::load(&initial_dir, None).unwrap());
        let versions_dir = temp.path().join("versions");
        Fixture {
            _temp: temp,
            versions_dir,
            initial,
        }
    }

    fn manager(
        fixture: &Fixture,
        transport: Arc<ScriptedTransport>,
        delegate: &Arc<RecordingDelegate>,
    ) -> BundleManager {
        let config = UpdateConfig::new(fixture.versions_dir.clone());
        let manager = BundleManager::new(config, Arc::clone(&fixture.initial), transport).unwrap();
        let delegate: Arc<dyn ManagerDelegate> = delegate.clone();
        manager.set_delegate(Arc::downgrade(&delegate));
        manager
    }

    fn base_url() -> Url {
        Url::parse("https://example.com/__cordova/").unwrap()
    }

    // ========================================================================
    // Tests
    // ========================================================================

    #[test]
    fn test_loads_existing_versions_and_skips_corrupt_ones() {
        let fixture = fixture();
        write_bundle_dir(&fixture.versions_dir.join("v2"), "v2", &[("app.js", "ccc")]);
        fs::create_dir_all(fixture.versions_dir.join("broken")).unwrap();
        fs::create_dir_all(fixture.versions_dir.join("Downloading")).unwrap();

        let transport = ScriptedTransport::new(&[]);
        let delegate = RecordingDelegate::new(true);
        let manager = manager(&fixture, transport, &delegate);

        assert_eq!(manager.downloaded_versions(), vec!["v2"]);
        let v2 = manager.downloaded_bundle("v2").unwrap();
        assert_eq!(v2.parent().unwrap().version(), "v1");
        assert!(manager.downloaded_bundle("broken").is_none());
    }

    #[tokio::test]
    async fn test_downloads_only_changed_assets() {
        let fixture = fixture();
        let transport = ScriptedTransport::new(&[
            ("/__cordova/manifest.json", manifest_json("v2", &[("app.js", "aaa"), ("lib.js", "ccc")])),
            ("/__cordova/lib.js", "new lib".to_string()),
            ("/__cordova/", index_html("v2")),
        ]);
        let delegate = RecordingDelegate::new(true);
        let manager = manager(&fixture, transport.clone(), &delegate);

        manager.check_for_updates(&base_url()).await;

        assert_eq!(*delegate.finished.lock(), vec!["v2"]);
        assert!(delegate.errors.lock().is_empty());

        let mut requested = transport.requested_paths();
        requested.sort();
        assert_eq!(
            requested,
            vec!["/__cordova/", "/__cordova/lib.js", "/__cordova/manifest.json"]
        );

        let v2_dir = fixture.versions_dir.join("v2");
        assert!(v2_dir.join(MANIFEST_FILENAME).exists());
        assert_eq!(fs::read_to_string(v2_dir.join("lib.js")).unwrap(), "new lib");
        assert!(!v2_dir.join("app.js").exists());
        assert!(!fixture.versions_dir.join("Downloading").exists());

        let bundle = manager.downloaded_bundle("v2").unwrap();
        assert!(bundle.is_stored_at(&v2_dir));
        assert!(!manager.is_downloading());
    }

    #[tokio::test]
    async fn test_initial_version_finishes_with_initial_bundle() {
        let fixture = fixture();
        let transport = ScriptedTransport::new(&[(
            "/__cordova/manifest.json",
            manifest_json("v1", &[("app.js", "aaa")]),
        )]);
        let delegate = RecordingDelegate::new(true);
        let manager = manager(&fixture, transport.clone(), &delegate);

        manager.check_for_updates(&base_url()).await;

        assert_eq!(*delegate.finished.lock(), vec!["v1"]);
        assert_eq!(transport.requested_paths().len(), 1);
    }

    #[tokio::test]
    async fn test_declined_manifest_downloads_nothing() {
        let fixture = fixture();
        let transport = ScriptedTransport::new(&[(
            "/__cordova/manifest.json",
            manifest_json("v3", &[("app.js", "zzz")]),
        )]);
        let delegate = RecordingDelegate::new(false);
        let manager = manager(&fixture, transport.clone(), &delegate);

        manager.check_for_updates(&base_url()).await;

        assert!(delegate.finished.lock().is_empty());
        assert_eq!(transport.requested_paths(), vec!["/__cordova/manifest.json"]);
        assert!(!fixture.versions_dir.join("v3").exists());
        assert!(!fixture.versions_dir.join("Downloading").exists());
    }

    #[tokio::test]
    async fn test_missing_manifest_reports_error() {
        let fixture = fixture();
        let transport = ScriptedTransport::new(&[]);
        let delegate = RecordingDelegate::new(true);
        let manager = manager(&fixture, transport, &delegate);

        manager.check_for_updates(&base_url()).await;

        let errors = delegate.errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("404"));
    }

    #[tokio::test]
    async fn test_reuses_assets_from_downloaded_version() {
        let fixture = fixture();
        write_bundle_dir(&fixture.versions_dir.join("v2"), "v2", &[("lib.js", "ccc")]);

        let transport = ScriptedTransport::new(&[
            ("/__cordova/manifest.json", manifest_json("v3", &[("app.js", "aaa"), ("lib.js", "ccc")])),
            ("/__cordova/", index_html("v3")),
        ]);
        let delegate = RecordingDelegate::new(true);
        let manager = manager(&fixture, transport.clone(), &delegate);

        manager.check_for_updates(&base_url()).await;

        assert_eq!(*delegate.finished.lock(), vec!["v3"]);
        assert!(!transport
            .requested_paths()
            .contains(&"/__cordova/lib.js".to_string()));
        assert_eq!(
            fs::read_to_string(fixture.versions_dir.join("v3").join("lib.js")).unwrap(),
            "content ccc"
        );
    }

    #[tokio::test]
    async fn test_remove_all_except_keeps_one_version() {
        let fixture = fixture();
        write_bundle_dir(&fixture.versions_dir.join("v2"), "v2", &[("lib.js", "ccc")]);
        write_bundle_dir(&fixture.versions_dir.join("v3"), "v3", &[("lib.js", "ddd")]);

        let transport = ScriptedTransport::new(&[]);
        let delegate = RecordingDelegate::new(true);
        let manager = manager(&fixture, transport, &delegate);

        assert_eq!(manager.remove_all_except(Some("v3")), 1);
        assert_eq!(manager.downloaded_versions(), vec!["v3"]);
        assert!(!fixture.versions_dir.join("v2").exists());
        assert!(fixture.versions_dir.join("v3").exists());
    }

    #[tokio::test]
    async fn test_dropped_delegate_is_not_called() {
        let fixture = fixture();
        let transport = ScriptedTransport::new(&[]);
        let delegate = RecordingDelegate::new(true);
        let manager = manager(&fixture, transport.clone(), &delegate);
        drop(delegate);

        manager.check_for_updates(&base_url()).await;

        assert_eq!(transport.requested_paths().len(), 1);
    }

    async fn wait_for_held_request(transport: &ScriptedTransport) {
        while transport.held.lock().is_some() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_overlapping_checks_for_same_version_download_once() {
        let fixture = fixture();
        let transport = ScriptedTransport::new(&[
            ("/__cordova/manifest.json", manifest_json("v2", &[("app.js", "aaa"), ("lib.js", "ccc")])),
            ("/__cordova/lib.js", "new lib".to_string()),
            ("/__cordova/", index_html("v2")),
        ]);
        let release = transport.hold_first("/__cordova/lib.js");
        let delegate = RecordingDelegate::new(true);
        let manager = manager(&fixture, transport.clone(), &delegate);

        let first_url = base_url();
        tokio::join!(manager.check_for_updates(&first_url), async {
            wait_for_held_request(&transport).await;
            manager.check_for_updates(&base_url()).await;
            release.notify_one();
        });

        assert!(delegate.errors.lock().is_empty(), "{:?}", delegate.errors.lock());
        assert_eq!(*delegate.finished.lock(), vec!["v2"]);
        let lib_requests = transport
            .requested_paths()
            .iter()
            .filter(|p| *p == "/__cordova/lib.js")
            .count();
        assert_eq!(lib_requests, 1);
        assert_eq!(
            fs::read_to_string(fixture.versions_dir.join("v2").join("lib.js")).unwrap(),
            "new lib"
        );
        assert!(!fixture.versions_dir.join("Downloading").exists());
    }

    #[tokio::test]
    async fn test_check_while_same_version_downloads_is_noop() {
        let fixture = fixture();
        let transport = ScriptedTransport::new(&[
            ("/__cordova/manifest.json", manifest_json("v2", &[("lib.js", "ccc")])),
            ("/__cordova/lib.js", "new lib".to_string()),
            ("/__cordova/", index_html("v2")),
        ]);
        let release = transport.hold_first("/__cordova/lib.js");
        let delegate = RecordingDelegate::new(true);
        let manager = manager(&fixture, transport.clone(), &delegate);

        let first_url = base_url();
        tokio::join!(manager.check_for_updates(&first_url), async {
            wait_for_held_request(&transport).await;
            let before = transport.requested_paths().len();
            manager.check_for_updates(&base_url()).await;

            // Only the second manifest request was made, and the first
            // download is still the one in flight.
            assert_eq!(transport.requested_paths().len(), before + 1);
            assert!(manager.is_downloading());
            assert!(delegate.finished.lock().is_empty());
            release.notify_one();
        });

        assert_eq!(*delegate.finished.lock(), vec!["v2"]);
        assert!(delegate.errors.lock().is_empty());
    }

    #[tokio::test]
    async fn test_newer_version_supersedes_in_flight_download() {
        let fixture = fixture();
        let transport = ScriptedTransport::new(&[
            ("/__cordova/manifest.json", manifest_json("v2", &[("lib.js", "ccc")])),
            ("/__cordova/lib.js", "lib".to_string()),
            ("/__cordova/", index_html("v2")),
        ]);
        let release = transport.hold_first("/__cordova/lib.js");
        let delegate = RecordingDelegate::new(true);
        let manager = manager(&fixture, transport.clone(), &delegate);

        let first_url = base_url();
        tokio::join!(manager.check_for_updates(&first_url), async {
            wait_for_held_request(&transport).await;
            transport.set_route(
                "/__cordova/manifest.json",
                manifest_json("v3", &[("lib.js", "ddd")]),
            );
            transport.set_route("/__cordova/", index_html("v3"));
            manager.check_for_updates(&base_url()).await;
            release.notify_one();
        });

        assert!(delegate.errors.lock().is_empty(), "{:?}", delegate.errors.lock());
        assert_eq!(*delegate.finished.lock(), vec!["v3"]);
        assert_eq!(manager.downloaded_versions(), vec!["v3"]);
        assert!(!fixture.versions_dir.join("v2").exists());
        assert!(fixture.versions_dir.join("v3").join("lib.js").exists());
        assert!(!manager.is_downloading());
    }
}
