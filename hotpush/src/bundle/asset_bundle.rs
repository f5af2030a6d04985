//! Versioned asset bundle with parent diffing.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use super::asset::{Asset, INDEX_URL_PATH};
use super::runtime_config::{RuntimeConfig, RuntimeConfigKeys};
use crate::error::{UpdateError, UpdateResult};
use crate::manifest::{parse_manifest, AssetManifest, MANIFEST_FILENAME};

/// The complete set of assets for one version.
///
/// A bundle only stores the assets it does not share with its parent. The
/// parent is always the initial bundle shipped with the app; it is the diff
/// root and never has a parent of its own, so the relation is at most one
/// level deep and cannot form a cycle.
#[derive(Debug)]
pub struct AssetBundle {
    version: String,
    directory: RwLock<PathBuf>,
    own_assets: HashMap<String, Asset>,
    parent: Option<Arc<AssetBundle>>,
    cordova_compatibility_versions: HashMap<String, String>,
    config_keys: RuntimeConfigKeys,
    runtime_config: OnceLock<Option<RuntimeConfig>>,
}

impl AssetBundle {
    /// Build a bundle for `manifest` stored in `directory`.
    ///
    /// An entry is left out of the bundle's own assets when the parent
    /// already holds a reusable copy of it (see
    /// [`cached_asset_for_url_path`](Self::cached_asset_for_url_path)).
    /// Source maps are diffed the same way, independently of their asset.
    pub fn new(
        directory: impl Into<PathBuf>,
        manifest: &AssetManifest,
        parent: Option<Arc<AssetBundle>>,
    ) -> Self {
        let parent = parent.map(diff_root);
        let mut own_assets = HashMap::new();

        for entry in &manifest.entries {
            let asset = Asset::from_entry(entry);
            let inherited = parent.as_ref().is_some_and(|p| {
                p.cached_asset_for_url_path(&asset.url_path, asset.hash.as_deref())
                    .is_some()
            });
            if !inherited {
                own_assets.insert(asset.url_path.clone(), asset);
            }

            if let Some(source_map) = Asset::source_map_for_entry(entry) {
                let inherited = parent.as_ref().is_some_and(|p| {
                    p.cached_asset_for_url_path(&source_map.url_path, None)
                        .is_some()
                });
                if !inherited {
                    own_assets.insert(source_map.url_path.clone(), source_map);
                }
            }
        }

        let index = Asset::index();
        own_assets.insert(index.url_path.clone(), index);

        let config_keys = parent
            .as_ref()
            .map(|p| p.config_keys.clone())
            .unwrap_or_default();

        Self {
            version: manifest.version.clone(),
            directory: RwLock::new(directory.into()),
            own_assets,
            parent,
            cordova_compatibility_versions: manifest.cordova_compatibility_versions.clone(),
            config_keys,
            runtime_config: OnceLock::new(),
        }
    }

    /// Load a bundle from a directory containing `program.json`.
    pub fn load(directory: impl Into<PathBuf>, parent: Option<Arc<AssetBundle>>) -> UpdateResult<Self> {
        let directory = directory.into();
        let manifest_path = directory.join(MANIFEST_FILENAME);
        let bytes = fs::read(&manifest_path)
            .map_err(|e| UpdateError::directory_io("read manifest", &manifest_path, e))?;
        let manifest = parse_manifest(&bytes)?;
        Ok(Self::new(directory, &manifest, parent))
    }

    /// Use custom runtime configuration key names.
    ///
    /// Bundles diffed against this one inherit the keys.
    pub fn with_runtime_config_keys(mut self, keys: RuntimeConfigKeys) -> Self {
        self.config_keys = keys;
        self
    }

    /// Runtime configuration key names in effect for this bundle.
    pub fn runtime_config_keys(&self) -> &RuntimeConfigKeys {
        &self.config_keys
    }

    /// A copy of this bundle that reads its runtime configuration with `keys`.
    pub fn rekeyed(&self, keys: RuntimeConfigKeys) -> Self {
        Self {
            version: self.version.clone(),
            directory: RwLock::new(self.directory()),
            own_assets: self.own_assets.clone(),
            parent: self.parent.clone(),
            cordova_compatibility_versions: self.cordova_compatibility_versions.clone(),
            config_keys: keys,
            runtime_config: OnceLock::new(),
        }
    }

    /// Version token of this bundle.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Directory the bundle's files live in.
    pub fn directory(&self) -> PathBuf {
        self.directory.read().clone()
    }

    /// Record that the bundle's directory has been moved.
    pub fn move_to_directory(&self, directory: impl Into<PathBuf>) {
        *self.directory.write() = directory.into();
    }

    /// The bundle this one is diffed against.
    pub fn parent(&self) -> Option<&Arc<AssetBundle>> {
        self.parent.as_ref()
    }

    /// Assets stored in this bundle's own directory.
    pub fn own_assets(&self) -> impl Iterator<Item = &Asset> {
        self.own_assets.values()
    }

    /// Number of assets stored in this bundle's own directory.
    pub fn own_asset_count(&self) -> usize {
        self.own_assets.len()
    }

    /// Find the asset served at `url_path`, falling back to the parent.
    pub fn asset_for_url_path(&self, url_path: &str) -> Option<&Asset> {
        self.own_assets.get(url_path).or_else(|| {
            self.parent
                .as_ref()
                .and_then(|p| p.asset_for_url_path(url_path))
        })
    }

    /// Find a reusable copy of the asset at `url_path` among own assets.
    ///
    /// A stored asset can be reused when the hashes match, or when no hash is
    /// requested and the stored asset is cacheable. Non-cacheable assets
    /// without a hash are never reused.
    pub fn cached_asset_for_url_path(&self, url_path: &str, hash: Option<&str>) -> Option<&Asset> {
        let asset = self.own_assets.get(url_path)?;
        let hash_matches = matches!((asset.hash.as_deref(), hash), (Some(a), Some(b)) if a == b);
        if (asset.cacheable && hash.is_none()) || hash_matches {
            Some(asset)
        } else {
            None
        }
    }

    /// Path of an own asset on disk.
    pub fn file_for_asset(&self, asset: &Asset) -> PathBuf {
        self.directory.read().join(&asset.file_path)
    }

    /// Path on disk of the asset served at `url_path`, own or inherited.
    pub fn file_for_url_path(&self, url_path: &str) -> Option<PathBuf> {
        match self.own_assets.get(url_path) {
            Some(asset) => Some(self.file_for_asset(asset)),
            None => self
                .parent
                .as_ref()
                .and_then(|p| p.file_for_url_path(url_path)),
        }
    }

    /// The index document of this bundle.
    pub fn index_file(&self) -> Option<&Asset> {
        self.own_assets.get(INDEX_URL_PATH)
    }

    /// Runtime configuration embedded in the index document.
    ///
    /// Read lazily and memoized once the index file has been read. A missing
    /// or undecodable configuration yields `None`.
    pub fn runtime_config(&self) -> Option<&RuntimeConfig> {
        if let Some(config) = self.runtime_config.get() {
            return config.as_ref();
        }

        let index_path = self.file_for_asset(self.index_file()?);
        let html = match fs::read_to_string(&index_path) {
            Ok(html) => html,
            Err(e) => {
                debug!(path = %index_path.display(), error = %e, "Index file not readable");
                return None;
            }
        };

        let parsed = RuntimeConfig::from_index_html(&html, self.config_keys.clone());
        if parsed.is_none() {
            debug!(version = %self.version, "No runtime config found in index file");
        }
        self.runtime_config.get_or_init(|| parsed).as_ref()
    }

    /// Application id from the runtime configuration.
    pub fn app_id(&self) -> Option<&str> {
        self.runtime_config().and_then(RuntimeConfig::app_id)
    }

    /// Root URL from the runtime configuration.
    pub fn root_url(&self) -> Option<&str> {
        self.runtime_config().and_then(RuntimeConfig::root_url)
    }

    /// Native compatibility version declared for `platform`.
    pub fn cordova_compatibility_version(&self, platform: &str) -> Option<&str> {
        self.cordova_compatibility_versions
            .get(platform)
            .map(String::as_str)
    }

    /// Whether this bundle's directory is `path`.
    pub fn is_stored_at(&self, path: &Path) -> bool {
        *self.directory.read() == path
    }
}

fn diff_root(bundle: Arc<AssetBundle>) -> Arc<AssetBundle> {
    match &bundle.parent {
        Some(root) => Arc::clone(root),
        None => bundle,
    }
}
