//! hotpush - Hot code push for packaged web applications
//!
//! This library keeps the web assets of an application running inside a
//! native shell up to date. It fetches new versions of the asset bundle from
//! the origin server, downloads only the files that changed, verifies every
//! file, and activates the new version on the next reload. A version that
//! fails to signal a successful startup in time is blacklisted and the shell
//! is rolled back to the last version known to work.
//!
//! # Modules
//!
//! - [`manifest`]: version manifest parsing
//! - [`bundle`]: asset bundles and their diff against the initial bundle
//! - [`manager`]: update checks, concurrent downloads, version directories
//! - [`lifecycle`]: pending/current/blacklisted versions and the startup watchdog
//! - [`config`]: runtime settings and the INI configuration file
//! - [`logging`]: tracing subscriber setup
//! - [`error`]: the crate error type

pub mod bundle;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod manager;
pub mod manifest;

pub use error::{UpdateError, UpdateResult};
