//! Checks applied to each downloaded asset before it is accepted.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::bundle::{Asset, AssetBundle};
use crate::error::{UpdateError, UpdateResult};
use crate::manager::traits::{ExpectedOrigin, HttpResponse};

fn etag_sha1_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#""([0-9a-f]{40})""#).expect("valid regex"))
}

/// Extract a quoted SHA-1 hash from an `ETag` header value.
pub fn etag_hash(etag: &str) -> Option<&str> {
    etag_sha1_pattern()
        .captures(etag)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Check status and, when both sides carry one, the content hash.
pub fn verify_response(response: &HttpResponse, asset: &Asset, url: &Url) -> UpdateResult<()> {
    if !response.is_success() {
        return Err(UpdateError::download_failure(
            url.as_str(),
            format!("non-success status code {} for asset {}", response.status, asset),
        ));
    }

    if let (Some(expected), Some(actual)) = (
        asset.hash.as_deref(),
        response.etag.as_deref().and_then(etag_hash),
    ) {
        if expected != actual {
            return Err(UpdateError::download_failure(
                url.as_str(),
                format!("hash mismatch for asset {}", asset),
            ));
        }
    }

    Ok(())
}

/// Check the runtime configuration of a freshly written index document.
///
/// The index has no hash, so the embedded version marker is what proves the
/// right version was served. An index without a readable configuration is
/// accepted as is.
pub fn verify_runtime_config(
    bundle: &AssetBundle,
    expected: &ExpectedOrigin,
    url: &Url,
) -> UpdateResult<()> {
    let Some(config) = bundle.runtime_config() else {
        return Ok(());
    };
    let fail = |reason: String| Err(UpdateError::download_failure(url.as_str(), reason));

    if let Some(actual) = config.version() {
        if actual != bundle.version() {
            return fail(format!(
                "version mismatch for index page, expected {}, actual {}",
                bundle.version(),
                actual
            ));
        }
    }

    let Some(root_url) = config.root_url() else {
        return fail("could not find ROOT_URL in downloaded asset bundle".to_string());
    };
    if let Some(previous) = expected.root_url.as_deref() {
        if !is_localhost(previous) && is_localhost(root_url) {
            return fail(format!(
                "ROOT_URL {} in downloaded asset bundle would change current ROOT_URL {} to localhost",
                root_url, previous
            ));
        }
    }

    let Some(app_id) = config.app_id() else {
        return fail("could not find appId in downloaded asset bundle".to_string());
    };
    if let Some(previous) = expected.app_id.as_deref() {
        if app_id != previous {
            return fail(format!(
                "appId {} in downloaded asset bundle does not match current appId {}; check that {} serves the right app",
                app_id, previous, root_url
            ));
        }
    }

    Ok(())
}

fn is_localhost(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .is_some_and(|u| u.host_str() == Some("localhost"))
}
