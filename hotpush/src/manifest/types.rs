//! Typed manifest structures produced by the parser.

use std::collections::HashMap;

/// One client asset declared by a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Path of the file relative to the bundle directory.
    pub file_path: String,
    /// URL path the asset is served at. May still carry query parameters.
    pub url_path: String,
    /// File type as declared by the build tool (`js`, `css`, `asset`, ...).
    pub file_type: String,
    /// Whether the asset may be reused without re-downloading.
    pub cacheable: bool,
    /// Content hash, when the build tool computed one.
    pub hash: Option<String>,
    /// Source map file path relative to the bundle directory.
    pub source_map_file_path: Option<String>,
    /// URL path the source map is served at.
    pub source_map_url_path: Option<String>,
}

impl ManifestEntry {
    /// Create an entry without hash or source map.
    pub fn new(
        file_path: impl Into<String>,
        url_path: impl Into<String>,
        file_type: impl Into<String>,
        cacheable: bool,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            url_path: url_path.into(),
            file_type: file_type.into(),
            cacheable,
            hash: None,
            source_map_file_path: None,
            source_map_url_path: None,
        }
    }

    /// Set the content hash.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Set the source map file and URL paths.
    pub fn with_source_map(
        mut self,
        file_path: impl Into<String>,
        url_path: impl Into<String>,
    ) -> Self {
        self.source_map_file_path = Some(file_path.into());
        self.source_map_url_path = Some(url_path.into());
        self
    }
}

/// A parsed manifest for one version of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    /// Version token identifying this release.
    pub version: String,
    /// Native compatibility version per platform (`android`, `ios`).
    pub cordova_compatibility_versions: HashMap<String, String>,
    /// Client entries in manifest order.
    pub entries: Vec<ManifestEntry>,
}

impl AssetManifest {
    /// Create a manifest from already-validated parts.
    pub fn new(version: impl Into<String>, entries: Vec<ManifestEntry>) -> Self {
        Self {
            version: version.into(),
            cordova_compatibility_versions: HashMap::new(),
            entries,
        }
    }

    /// Compatibility version recorded for a platform, if any.
    pub fn cordova_compatibility_version(&self, platform: &str) -> Option<&str> {
        self.cordova_compatibility_versions
            .get(platform)
            .map(String::as_str)
    }
}
