//! `resolve`: show which file would be served for a URL path.

use hotpush::config::ConfigFile;

use super::common::Session;
use crate::error::CliError;

pub fn run(file: &ConfigFile, url_path: &str) -> Result<(), CliError> {
    let session = Session::open(file)?;
    let path = if url_path.starts_with('/') {
        url_path.to_string()
    } else {
        format!("/{}", url_path)
    };

    match session.lifecycle.file_for_url_path(&path) {
        Some(file) => {
            println!("{}", file.display());
            Ok(())
        }
        None => Err(CliError::NotFound(path)),
    }
}
