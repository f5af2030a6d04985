//! Bundle manager: update checks, downloads, and on-disk versions.
//!
//! # Architecture
//!
//! ```text
//! BundleManager
//!     │
//!     ├── check_for_updates(base_url)
//!     │       GET <base_url>/manifest.json ──► parse_manifest
//!     │       │
//!     │       ├── delegate.should_download(manifest)?
//!     │       ├── initial or already downloaded ──► on_finished_downloading
//!     │       └── stage in Downloading/ ──► download_asset_bundle
//!     │
//!     ├── download_asset_bundle(bundle, base_url)
//!     │       reuse cached copies ──► BundleDownloader (missing assets)
//!     │       │
//!     │       └── rename Downloading/ ──► <version>/ ──► on_finished_downloading
//!     │
//!     └── remove_all_except(version)
//! ```
//!
//! Errors never propagate out of the manager's async operations; they are
//! delivered to [`ManagerDelegate::on_error`].

mod bundle_manager;
pub mod download;
mod layout;
pub mod traits;

pub use bundle_manager::BundleManager;
pub use download::{DownloadOutcome, ReqwestTransport};
pub use layout::{VersionsLayout, DOWNLOADING_DIR, PARTIAL_DOWNLOAD_DIR};
pub use traits::{BoxFuture, ExpectedOrigin, HttpResponse, HttpTransport, ManagerDelegate};
