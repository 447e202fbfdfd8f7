//! Photo download: the only stage with network I/O.
//!
//! The resolver talks to an [`ImageFetcher`] rather than to reqwest
//! directly so callers (and tests) can substitute their own transport.
//! [`HttpFetcher`] is the default and shares one connection pool across
//! every record of a run.

use crate::error::GenerateError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// A downloaded body and its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// Raw `Content-Type` header value, if the server sent one.
    pub content_type: Option<String>,
}

impl FetchedImage {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.map(str::to_string),
        }
    }
}

/// Why a fetch produced no usable body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Host unreachable, connection reset, TLS failure, body read error…
    #[error("network error: {0}")]
    Network(String),

    /// The transport gave up waiting.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-2xx status.
    #[error("HTTP {0}")]
    Status(u16),
}

impl FetchError {
    /// Whether a retry has a reasonable chance of succeeding.
    ///
    /// 4xx answers are permanent; 5xx, timeouts and connection failures are
    /// usually not.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout => true,
            FetchError::Status(code) => *code >= 500,
        }
    }
}

/// Downloads a photo.
///
/// Implementations must be `Send + Sync`: photos of different records are
/// fetched concurrently.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError>;
}

/// reqwest-backed [`ImageFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher whose every request is bounded by `timeout_secs`.
    pub fn new(timeout_secs: u64) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("inventory-pdf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GenerateError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (custom proxy, TLS roots, …).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest)?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await.map_err(map_reqwest)?;
        debug!("Fetched {} bytes ({:?}) from {}", bytes.len(), content_type, url);

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

fn map_reqwest(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = e.status() {
        FetchError::Status(status.as_u16())
    } else {
        FetchError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::Network("reset".into()).is_transient());
        assert!(FetchError::Status(503).is_transient());
        assert!(!FetchError::Status(404).is_transient());
        assert!(!FetchError::Status(403).is_transient());
    }

    #[test]
    fn http_fetcher_builds() {
        assert!(HttpFetcher::new(5).is_ok());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let fetcher = HttpFetcher::new(2).expect("client");
        // Port 9 (discard) on localhost is closed on any sane test machine.
        let err = fetcher
            .fetch("http://127.0.0.1:9/a.png")
            .await
            .expect_err("nothing listens there");
        assert!(err.is_transient(), "got {err:?}");
    }
}
