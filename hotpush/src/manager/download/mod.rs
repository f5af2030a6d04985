//! Asset download for a single bundle.
//!
//! This module provides:
//! - Streaming HTTP transport built on reqwest (`http`)
//! - Per-asset response and index verification (`verify`)
//! - Missing-asset tracking and download outcomes (`state`)
//! - The concurrent bundle downloader (`downloader`)
//!
//! # Architecture
//!
//! ```text
//! BundleDownloader
//!         │
//!         ├── Semaphore (caps requests in flight)
//!         │
//!         ├── HttpTransport (trait)
//!         │       └── ReqwestTransport
//!         │
//!         ├── verify (status, ETag hash, index runtime config)
//!         │
//!         └── MissingAssets (completion tracking)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hotpush::manager::download::{BundleDownloader, ReqwestTransport};
//!
//! let transport = Arc::new(ReqwestTransport::new()?);
//! let downloader = BundleDownloader::new(bundle, base_url, missing, transport, 6, origin);
//!
//! match downloader.run().await {
//!     DownloadOutcome::Finished => println!("done"),
//!     DownloadOutcome::Failed(e) => eprintln!("{}", e),
//!     DownloadOutcome::Canceled => {}
//! }
//! ```

mod downloader;
mod http;
mod state;
mod verify;

pub use downloader::{asset_url, BundleDownloader, DONT_SERVE_INDEX_PARAM};
pub use http::ReqwestTransport;
pub use state::{DownloadOutcome, MissingAssets};
pub use verify::{etag_hash, verify_response, verify_runtime_config};
