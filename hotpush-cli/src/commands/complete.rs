//! `complete`: report a successful startup of the current version.

use hotpush::config::ConfigFile;

use super::common::Session;
use crate::error::CliError;

/// Activate the current version, mark it last known good, and prune the rest.
pub async fn run(file: &ConfigFile) -> Result<(), CliError> {
    let session = Session::open(file)?;
    let lifecycle = &session.lifecycle;

    lifecycle.activate();
    let removed = lifecycle.startup_did_complete().await;

    println!(
        "Version {} marked as last known good",
        lifecycle.current_bundle().version()
    );
    println!("Removed {} old version(s)", removed);
    Ok(())
}
