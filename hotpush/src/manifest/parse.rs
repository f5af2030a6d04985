//! Manifest parsing.
//!
//! Parsing happens in two passes. Serde first reads the document into raw
//! structs where every key is optional, so a missing key never surfaces as an
//! opaque serde message. Validation then promotes the raw document into an
//! [`AssetManifest`], naming the first required key that is absent.
//!
//! The version and the entry paths become directory and file names on disk,
//! so they are confined: a version is one plain path component that does not
//! name a staging directory, and file paths are relative without `..`.

use std::collections::HashMap;
use std::path::{Component, Path};

use serde::Deserialize;

use super::types::{AssetManifest, ManifestEntry};
use crate::error::{UpdateError, UpdateResult};
use crate::manager::{DOWNLOADING_DIR, PARTIAL_DOWNLOAD_DIR};

/// The only manifest format this client understands.
pub const MANIFEST_FORMAT: &str = "web-program-pre1";

/// Role of the entries that belong to the client bundle.
const CLIENT_ROLE: &str = "client";

#[derive(Debug, Deserialize)]
struct RawManifest {
    format: Option<String>,
    version: Option<String>,
    #[serde(rename = "cordovaCompatibilityVersions")]
    cordova_compatibility_versions: Option<HashMap<String, serde_json::Value>>,
    manifest: Option<Vec<RawEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "where")]
    role: Option<String>,
    path: Option<String>,
    url: Option<String>,
    #[serde(rename = "type")]
    file_type: Option<String>,
    cacheable: Option<bool>,
    hash: Option<String>,
    #[serde(rename = "sourceMap")]
    source_map: Option<String>,
    #[serde(rename = "sourceMapUrl")]
    source_map_url: Option<String>,
}

/// Parse a manifest document.
///
/// # Errors
///
/// - [`UpdateError::FormatIncompatible`] if `format` is not [`MANIFEST_FORMAT`]
/// - [`UpdateError::MalformedManifest`] for invalid JSON, a missing required
///   key, or a version or file path that would leave its bundle directory
pub fn parse_manifest(bytes: &[u8]) -> UpdateResult<AssetManifest> {
    let raw: RawManifest = serde_json::from_slice(bytes)
        .map_err(|e| UpdateError::MalformedManifest(e.to_string()))?;

    if raw.format.as_deref() != Some(MANIFEST_FORMAT) {
        return Err(UpdateError::FormatIncompatible { found: raw.format });
    }

    let version = required(raw.version, "version")?;
    check_version_name(&version)?;
    let raw_entries = required(raw.manifest, "manifest")?;

    let mut entries = Vec::with_capacity(raw_entries.len());
    for (index, raw_entry) in raw_entries.into_iter().enumerate() {
        if let Some(entry) = validate_entry(raw_entry, index)? {
            entries.push(entry);
        }
    }

    let cordova_compatibility_versions = raw
        .cordova_compatibility_versions
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(platform, value)| match value {
            serde_json::Value::String(s) => Some((platform, s)),
            _ => None,
        })
        .collect();

    Ok(AssetManifest {
        version,
        cordova_compatibility_versions,
        entries,
    })
}

/// Validate one raw entry. Returns `None` for entries that are not client assets.
fn validate_entry(raw: RawEntry, index: usize) -> UpdateResult<Option<ManifestEntry>> {
    let role = required(raw.role, &format!("manifest[{}].where", index))?;
    if role != CLIENT_ROLE {
        return Ok(None);
    }

    let field = |name: &str| format!("manifest[{}].{}", index, name);

    let file_path = required(raw.path, &field("path"))?;
    check_relative_path(&file_path, &field("path"))?;
    if let Some(source_map) = &raw.source_map {
        check_relative_path(source_map, &field("sourceMap"))?;
    }

    Ok(Some(ManifestEntry {
        file_path,
        url_path: required(raw.url, &field("url"))?,
        file_type: required(raw.file_type, &field("type"))?,
        cacheable: required(raw.cacheable, &field("cacheable"))?,
        hash: raw.hash,
        source_map_file_path: raw.source_map,
        source_map_url_path: raw.source_map_url,
    }))
}

/// A version names its directory under the versions root.
fn check_version_name(version: &str) -> UpdateResult<()> {
    let mut components = Path::new(version).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == version
    );

    if !single || version == DOWNLOADING_DIR || version == PARTIAL_DOWNLOAD_DIR {
        return Err(UpdateError::MalformedManifest(format!(
            "version '{}' is not a valid directory name",
            version
        )));
    }
    Ok(())
}

/// File paths must stay inside the bundle directory.
fn check_relative_path(path: &str, key: &str) -> UpdateResult<()> {
    let mut has_name = false;
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) => has_name = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                has_name = false;
                break;
            }
        }
    }

    if !has_name {
        return Err(UpdateError::MalformedManifest(format!(
            "'{}' is not a relative file path for key '{}'",
            path, key
        )));
    }
    Ok(())
}

fn required<T>(value: Option<T>, key: &str) -> UpdateResult<T> {
    value.ok_or_else(|| UpdateError::MalformedManifest(format!("missing required key '{}'", key)))
}
