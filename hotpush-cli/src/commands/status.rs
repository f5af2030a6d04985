//! `status`: print the persisted lifecycle state and the versions on disk.

use hotpush::config::ConfigFile;

use super::common::Session;
use crate::error::CliError;

pub fn run(file: &ConfigFile) -> Result<(), CliError> {
    let session = Session::open(file)?;
    let lifecycle = &session.lifecycle;
    let state = lifecycle.state();

    println!("Version Status");
    println!("==============");
    println!();
    println!("  Bundled version:        {}", lifecycle.manager().initial_bundle().version());
    println!("  Current version:        {}", lifecycle.current_bundle().version());
    println!("  Last downloaded:        {}", or_unset(state.last_downloaded_version()));
    println!("  Last known good:        {}", or_unset(state.last_known_good_version()));
    println!("  App ID:                 {}", or_unset(state.app_id()));
    println!("  Root URL:               {}", or_unset(state.root_url()));
    println!(
        "  Compatibility version:  {}",
        or_unset(state.cordova_compatibility_version())
    );

    let blacklisted = state.blacklisted_versions();
    if blacklisted.is_empty() {
        println!("  Blacklisted:            (none)");
    } else {
        let list: Vec<&str> = blacklisted.iter().map(String::as_str).collect();
        println!("  Blacklisted:            {}", list.join(", "));
    }

    println!();
    println!("Downloaded versions ({}):", session.config.versions_dir.display());
    let versions = lifecycle.manager().downloaded_versions();
    if versions.is_empty() {
        println!("  (none)");
    }
    for version in versions {
        println!("  {}", version);
    }

    Ok(())
}

fn or_unset(value: Option<String>) -> String {
    value.unwrap_or_else(|| "(not set)".to_string())
}
