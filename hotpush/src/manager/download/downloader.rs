//! Concurrent download of a bundle's missing assets.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use url::Url;

use super::state::{DownloadOutcome, MissingAssets};
use super::verify::{verify_response, verify_runtime_config};
use crate::bundle::{Asset, AssetBundle};
use crate::error::{UpdateError, UpdateResult};
use crate::manager::traits::{BodyStream, ExpectedOrigin, HttpTransport};

/// Query parameter that stops the server from answering unknown paths with
/// the index document.
pub const DONT_SERVE_INDEX_PARAM: &str = "meteor_dont_serve_index";

const PARTIAL_SUFFIX: &str = ".partial";

/// URL an asset is requested from, relative to `base_url`.
pub fn asset_url(base_url: &Url, asset: &Asset) -> UpdateResult<Url> {
    let relative = asset.url_path.trim_start_matches('/');
    let mut url = base_url
        .join(relative)
        .map_err(|e| UpdateError::InvalidUrl {
            url: format!("{}{}", base_url, relative),
            reason: e.to_string(),
        })?;
    if !asset.is_index() {
        url.query_pairs_mut().append_pair(DONT_SERVE_INDEX_PARAM, "true");
    }
    Ok(url)
}

/// Downloads the missing assets of one bundle.
///
/// At most `max_requests` requests are in flight at once. The first failure
/// cancels the remaining requests; [`run`](Self::run) resolves exactly once.
pub struct BundleDownloader {
    bundle: Arc<AssetBundle>,
    base_url: Url,
    assets: Vec<Asset>,
    missing: MissingAssets,
    transport: Arc<dyn HttpTransport>,
    limiter: Semaphore,
    expected: ExpectedOrigin,
    cancellation: CancellationToken,
}

impl BundleDownloader {
    /// Create a downloader for `assets` of `bundle`.
    pub fn new(
        bundle: Arc<AssetBundle>,
        base_url: Url,
        assets: Vec<Asset>,
        transport: Arc<dyn HttpTransport>,
        max_requests: usize,
        expected: ExpectedOrigin,
    ) -> Self {
        let missing = MissingAssets::new(assets.iter().map(|a| a.url_path.clone()));
        Self {
            bundle,
            base_url,
            assets,
            missing,
            transport,
            limiter: Semaphore::new(max_requests.max(1)),
            expected,
            cancellation: CancellationToken::new(),
        }
    }

    /// The bundle being downloaded.
    pub fn bundle(&self) -> &Arc<AssetBundle> {
        &self.bundle
    }

    /// Number of assets still missing.
    pub fn remaining(&self) -> usize {
        self.missing.remaining()
    }

    /// Stop the download. Safe to call more than once.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Whether the download has been canceled or has failed.
    pub fn is_canceled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fetch every missing asset and report how the download ended.
    pub async fn run(&self) -> DownloadOutcome {
        if self.missing.is_empty() {
            return DownloadOutcome::Finished;
        }

        info!(
            version = %self.bundle.version(),
            assets = self.missing.total(),
            "Downloading asset bundle"
        );

        let mut pending: FuturesUnordered<_> =
            self.assets.iter().map(|asset| self.fetch_asset(asset)).collect();

        loop {
            tokio::select! {
                biased;

                _ = self.cancellation.cancelled() => {
                    debug!(
                        version = %self.bundle.version(),
                        remaining = self.missing.remaining(),
                        "Download canceled"
                    );
                    return DownloadOutcome::Canceled;
                }

                next = pending.next() => match next {
                    Some(Ok(url_path)) => {
                        if self.missing.complete(&url_path) {
                            info!(version = %self.bundle.version(), "Finished downloading asset bundle");
                            return DownloadOutcome::Finished;
                        }
                    }
                    Some(Err(e)) => {
                        self.cancellation.cancel();
                        error!(version = %self.bundle.version(), error = %e, "Asset bundle download failed");
                        return DownloadOutcome::Failed(e);
                    }
                    None => {
                        return if self.missing.is_empty() {
                            DownloadOutcome::Finished
                        } else {
                            DownloadOutcome::Failed(UpdateError::download_failure(
                                self.base_url.as_str(),
                                format!("{} assets were never downloaded", self.missing.remaining()),
                            ))
                        };
                    }
                }
            }
        }
    }

    async fn fetch_asset(&self, asset: &Asset) -> UpdateResult<String> {
        let url = asset_url(&self.base_url, asset)?;
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| UpdateError::download_failure(url.as_str(), "request limiter closed"))?;

        debug!(url = %url, "Downloading asset");
        let response = self.transport.get(&url).await?;
        verify_response(&response, asset, &url)?;

        let path = self.bundle.file_for_asset(asset);
        write_body(response.body, &path, &url).await?;

        if asset.is_index() {
            verify_runtime_config(&self.bundle, &self.expected, &url)?;
        }

        debug!(url = %url, path = %path.display(), "Asset downloaded");
        Ok(asset.url_path.clone())
    }
}

/// Stream `body` into `path`.
///
/// The bytes land in a sibling `.partial` file that is renamed over `path`
/// once complete, so `path` never holds a truncated asset.
async fn write_body(mut body: BodyStream, path: &Path, url: &Url) -> UpdateResult<()> {
    let write_failure = |e: std::io::Error| {
        UpdateError::download_failure(
            url.as_str(),
            format!("write to {} failed: {}", path.display(), e),
        )
    };

    let partial = partial_path(path);
    let file = tokio::fs::File::create(&partial).await.map_err(write_failure)?;
    let mut writer = BufWriter::new(file);

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| {
            UpdateError::download_failure(url.as_str(), format!("read error: {}", e))
        })?;
        writer.write_all(&chunk).await.map_err(write_failure)?;
    }
    writer.flush().await.map_err(write_failure)?;
    drop(writer);

    tokio::fs::rename(&partial, path).await.map_err(write_failure)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}
