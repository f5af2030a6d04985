//! Collaborator traits for the bundle manager.
//!
//! These seams keep the manager independent of the HTTP library and of the
//! component that consumes its results:
//! - [`HttpTransport`]: issues GET requests and streams response bodies
//! - [`ManagerDelegate`]: decides whether to download and receives results

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use url::Url;

use crate::bundle::AssetBundle;
use crate::error::{UpdateError, UpdateResult};
use crate::manifest::AssetManifest;

/// Boxed future used by the object-safe async traits in this module.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Streamed response body.
pub type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// A response whose headers have arrived and whose body has not been read.
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw `ETag` header value, if any.
    pub etag: Option<String>,
    /// Response body.
    pub body: BodyStream,
}

impl HttpResponse {
    /// Create a response from its parts.
    pub fn new(status: u16, etag: Option<String>, body: BodyStream) -> Self {
        Self { status, etag, body }
    }

    /// Create a response with a body held in memory.
    pub fn from_bytes(status: u16, etag: Option<String>, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self::new(status, etag, Box::pin(futures::stream::once(async move { Ok::<_, io::Error>(body) })))
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the whole body into memory.
    pub async fn bytes(mut self, url: &Url) -> UpdateResult<Vec<u8>> {
        let mut buffer = Vec::new();
        while let Some(chunk) = self.body.next().await {
            let chunk = chunk.map_err(|e| UpdateError::TransportFailure {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer)
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("etag", &self.etag)
            .finish_non_exhaustive()
    }
}

/// Issues HTTP GET requests.
///
/// Implementations return [`UpdateError::TransportFailure`] when the server
/// cannot be reached. Non-2xx responses are returned as responses; judging the
/// status is up to the caller.
pub trait HttpTransport: Send + Sync {
    /// Send a GET request for `url`.
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, UpdateResult<HttpResponse>>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn get<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, UpdateResult<HttpResponse>> {
        (**self).get(url)
    }
}

/// Expectations an incoming index document is checked against.
///
/// Both values come from the persisted state of the currently running
/// version; `None` means nothing has been recorded yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedOrigin {
    pub app_id: Option<String>,
    pub root_url: Option<String>,
}

/// Receives the outcome of update checks.
///
/// The manager holds its delegate weakly. Callbacks run on the task that
/// performed the check or download and must not block.
pub trait ManagerDelegate: Send + Sync {
    /// Whether the version described by `manifest` should be downloaded.
    fn should_download(&self, manifest: &AssetManifest) -> bool;

    /// A bundle is complete and stored on disk.
    fn on_finished_downloading(&self, bundle: Arc<AssetBundle>);

    /// An update check or download failed.
    fn on_error(&self, error: UpdateError);

    /// Origin the downloaded index document must match.
    fn expected_origin(&self) -> ExpectedOrigin {
        ExpectedOrigin::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bytes_concatenates_chunks() {
        let chunks: Vec<io::Result<Bytes>> = vec![Ok(Bytes::from_static(b"he")), Ok(Bytes::from_static(b"llo"))];
        let response = HttpResponse::new(200, None, Box::pin(futures::stream::iter(chunks)));
        let url = Url::parse("http://localhost/manifest.json").unwrap();

        assert!(response.is_success());
        assert_eq!(response.bytes(&url).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_body_error_is_transport_failure() {
        let chunks: Vec<io::Result<Bytes>> = vec![Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))];
        let response = HttpResponse::new(200, None, Box::pin(futures::stream::iter(chunks)));
        let url = Url::parse("http://localhost/manifest.json").unwrap();

        assert!(matches!(
            response.bytes(&url).await,
            Err(UpdateError::TransportFailure { .. })
        ));
    }

    #[test]
    fn test_status_ranges() {
        assert!(!HttpResponse::from_bytes(404, None, "").is_success());
        assert!(!HttpResponse::from_bytes(301, None, "").is_success());
        assert!(HttpResponse::from_bytes(204, None, "").is_success());
    }
}
