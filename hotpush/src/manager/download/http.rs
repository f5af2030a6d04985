//! reqwest-backed HTTP transport.
//!
//! Responses are handed back as soon as the headers arrive; the body is
//! exposed as a byte stream so assets can be written to disk chunk by chunk
//! instead of being buffered whole.

use std::io;
use std::time::Duration;

use futures::stream::StreamExt;
use reqwest::header::ETAG;
use reqwest::Client;
use url::Url;

use crate::config::DEFAULT_HTTP_TIMEOUT;
use crate::error::{UpdateError, UpdateResult};
use crate::manager::traits::{BoxFuture, HttpResponse, HttpTransport};

/// HTTP transport built on an async [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    pub(crate) timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with the default timeout.
    pub fn new() -> UpdateResult<Self> {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a transport with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> UpdateResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpdateError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, UpdateResult<HttpResponse>> {
        Box::pin(async move {
            let response = self.client.get(url.clone()).send().await.map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("timed out after {}s", self.timeout.as_secs())
                } else {
                    e.to_string()
                };
                UpdateError::TransportFailure {
                    url: url.to_string(),
                    reason,
                }
            })?;

            let status = response.status().as_u16();
            let etag = response
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(io::Error::other));

            Ok(HttpResponse::new(status, etag, Box::pin(body)))
        })
    }
}
