//! Asset manifest types and parsing.
//!
//! A manifest enumerates every file that makes up one version of the web
//! application. It is fetched from the server as `manifest.json` and stored
//! verbatim next to the downloaded assets as `program.json`.
//!
//! # Format
//!
//! ```text
//! {
//!   "format": "web-program-pre1",
//!   "version": "7f3c1e...",
//!   "cordovaCompatibilityVersions": { "android": "...", "ios": "..." },
//!   "manifest": [
//!     { "where": "client", "path": "app/app.js", "url": "/app/app.js?hash=...",
//!       "type": "js", "cacheable": true, "hash": "...",
//!       "sourceMap": "app/app.js.map", "sourceMapUrl": "/app/app.js.map" },
//!     ...
//!   ]
//! }
//! ```
//!
//! Only entries whose `where` is `"client"` are retained. Server-side and
//! internal entries are skipped without validating their other fields.

mod parse;
mod types;

pub use parse::{parse_manifest, MANIFEST_FORMAT};
pub use types::{AssetManifest, ManifestEntry};

/// Name of the manifest file served by the origin.
pub const MANIFEST_URL_PATH: &str = "manifest.json";

/// Name of the manifest file stored inside every bundle directory.
pub const MANIFEST_FILENAME: &str = "program.json";
