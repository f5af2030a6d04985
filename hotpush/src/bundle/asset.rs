//! A single file belonging to an asset bundle.

use std::fmt;

use crate::manifest::ManifestEntry;

/// File path of the index document inside every bundle.
pub const INDEX_FILE_PATH: &str = "index.html";

/// URL path the index document is served at.
pub const INDEX_URL_PATH: &str = "/";

/// One static file of a bundle.
///
/// The caching identity of an asset is `(url_path, hash)`; see
/// [`AssetBundle::cached_asset_for_url_path`](super::AssetBundle::cached_asset_for_url_path).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asset {
    /// Path relative to the bundle directory.
    pub file_path: String,
    /// URL path without query parameters.
    pub url_path: String,
    /// File type as declared in the manifest.
    pub file_type: String,
    /// Whether the asset may be reused across versions.
    pub cacheable: bool,
    /// Content hash, if known.
    pub hash: Option<String>,
    /// URL path of the asset's source map.
    pub source_map_url_path: Option<String>,
}

impl Asset {
    /// Create an asset. Query parameters are stripped from `url_path`.
    pub fn new(
        file_path: impl Into<String>,
        url_path: &str,
        file_type: impl Into<String>,
        cacheable: bool,
        hash: Option<String>,
        source_map_url_path: Option<String>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            url_path: strip_query(url_path).to_string(),
            file_type: file_type.into(),
            cacheable,
            hash,
            source_map_url_path,
        }
    }

    /// Build the asset described by a manifest entry.
    pub fn from_entry(entry: &ManifestEntry) -> Self {
        Self::new(
            entry.file_path.clone(),
            &entry.url_path,
            entry.file_type.clone(),
            entry.cacheable,
            entry.hash.clone(),
            entry.source_map_url_path.clone(),
        )
    }

    /// Build the source map asset for an entry, if it declares one.
    ///
    /// Source maps are cacheable and carry no hash of their own.
    pub fn source_map_for_entry(entry: &ManifestEntry) -> Option<Self> {
        match (&entry.source_map_file_path, &entry.source_map_url_path) {
            (Some(file_path), Some(url_path)) => Some(Self::new(
                file_path.clone(),
                url_path,
                "json",
                true,
                None,
                None,
            )),
            _ => None,
        }
    }

    /// The synthetic index document every bundle contains.
    pub fn index() -> Self {
        Self::new(INDEX_FILE_PATH, INDEX_URL_PATH, "html", false, None, None)
    }

    /// Whether this asset is the index document.
    pub fn is_index(&self) -> bool {
        self.file_path == INDEX_FILE_PATH
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url_path, self.file_path)
    }
}

/// Remove the query string and fragment from a URL path.
pub(crate) fn strip_query(url_path: &str) -> &str {
    url_path
        .find(|c| c == '?' || c == '#')
        .map_or(url_path, |end| &url_path[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_query() {
        assert_eq!(strip_query("/app.js?hash=abc"), "/app.js");
        assert_eq!(strip_query("/app.js#frag"), "/app.js");
        assert_eq!(strip_query("/app.js"), "/app.js");
        assert_eq!(strip_query("/?x=1"), "/");
    }

    #[test]
    fn test_from_entry_strips_query() {
        let entry = ManifestEntry::new("app/app.js", "/app/app.js?meteor_js_resource=true", "js", true)
            .with_hash("abc");
        let asset = Asset::from_entry(&entry);

        assert_eq!(asset.url_path, "/app/app.js");
        assert_eq!(asset.file_path, "app/app.js");
        assert_eq!(asset.hash.as_deref(), Some("abc"));
        assert!(!asset.is_index());
    }

    #[test]
    fn test_source_map_for_entry() {
        let plain = ManifestEntry::new("a.js", "/a.js", "js", true);
        assert!(Asset::source_map_for_entry(&plain).is_none());

        let mapped = plain.with_source_map("a.js.map", "/a.js.map?v=1");
        let map = Asset::source_map_for_entry(&mapped).unwrap();
        assert_eq!(map.url_path, "/a.js.map");
        assert_eq!(map.file_type, "json");
        assert!(map.cacheable);
        assert!(map.hash.is_none());
    }

    #[test]
    fn test_index_asset() {
        let index = Asset::index();
        assert!(index.is_index());
        assert_eq!(index.url_path, "/");
        assert!(!index.cacheable);
        assert!(index.hash.is_none());
    }
}
