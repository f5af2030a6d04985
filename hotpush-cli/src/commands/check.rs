//! `check`: ask the origin for a new version and download it.

use hotpush::config::ConfigFile;
use hotpush::lifecycle::{LifecycleEvent, VersionLifecycle};
use tokio::sync::broadcast::error::TryRecvError;

use super::common::Session;
use crate::error::CliError;

/// Run an update check against `root_url`, or the configured/persisted root URL.
pub async fn run(file: &ConfigFile, root_url: Option<String>) -> Result<(), CliError> {
    let session = Session::open(file)?;
    let lifecycle = &session.lifecycle;
    let mut events = lifecycle.subscribe();

    println!("Current version: {}", lifecycle.current_bundle().version());

    match root_url.or(session.root_url) {
        Some(root) => {
            let base_url = VersionLifecycle::base_url_for(&root)?;
            println!("Checking {}", base_url);
            lifecycle.manager().check_for_updates(&base_url).await;
        }
        None => {
            println!("Checking {}", lifecycle.update_base_url()?);
            lifecycle.check_for_updates().await?;
        }
    }

    let mut failure = None;
    loop {
        match events.try_recv() {
            Ok(LifecycleEvent::NewVersionReady(version)) => {
                println!("Downloaded version {}; it is served after the next restart", version);
            }
            Ok(LifecycleEvent::DownloadFailed(reason)) => failure = Some(reason),
            Ok(LifecycleEvent::RevertScheduled { from, to }) => {
                println!("Reverting from {} to {}", from, to);
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }

    if let Some(reason) = failure {
        return Err(CliError::UpdateFailed(reason));
    }
    if lifecycle.pending_bundle().is_none() {
        println!("Already up to date");
    }
    Ok(())
}
