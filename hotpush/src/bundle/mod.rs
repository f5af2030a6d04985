//! Versioned asset bundles.
//!
//! An [`AssetBundle`] is the in-memory view of one version of the web
//! application: its assets, where they live on disk, and the runtime
//! configuration embedded in its index document.
//!
//! # Diffing
//!
//! ```text
//! initial bundle (shipped with the app, diff root)
//! ├── /app.js   hash=aaa
//! ├── /app.css  hash=ccc
//! └── /
//!
//! downloaded bundle v2 (parent = initial)
//! ├── /app.css  hash=ddd   ← changed, stored in v2's directory
//! └── /                    ← index, always owned
//!     (/app.js hash=aaa resolved through the parent)
//! ```

mod asset;
mod asset_bundle;
mod runtime_config;

pub use asset::{Asset, INDEX_FILE_PATH, INDEX_URL_PATH};
pub(crate) use asset::strip_query;
pub use asset_bundle::AssetBundle;
pub use runtime_config::{RuntimeConfig, RuntimeConfigKeys};

#[cfg(test)]
pub(crate) use runtime_config::index_html_with_config;
