//! Outbound HTTP transport
//!
//! A [`Connection`] issues one request to an endpoint and returns the raw
//! response body. [`HttpConnection`] is the `reqwest` implementation used by
//! the proxy and by replication.

use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Handle able to send a request body to an address
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// POST `body` to `url` and return the response body
    ///
    /// Transport failures and non-success statuses are reported as
    /// [`Error::Upstream`].
    async fn send(&self, url: &str, body: Bytes) -> Result<Bytes>;
}

/// HTTP connection backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpConnection {
    client: reqwest::Client,
    content_type: &'static str,
}

impl HttpConnection {
    /// Create a connection with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::build(Some(timeout), "text/plain")
    }

    /// Create a connection that sends JSON bodies
    pub fn json(timeout: Duration) -> Result<Self> {
        Self::build(Some(timeout), "application/json")
    }

    /// Create a JSON connection without a request timeout
    ///
    /// Each send must be bounded by the caller.
    pub fn json_unbounded() -> Result<Self> {
        Self::build(None, "application/json")
    }

    fn build(timeout: Option<Duration>, content_type: &'static str) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            content_type,
        })
    }
}

#[async_trait]
impl Connection for HttpConnection {
    async fn send(&self, url: &str, body: Bytes) -> Result<Bytes> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, self.content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::upstream(url, e))?;

        let response = response
            .error_for_status()
            .map_err(|e| Error::upstream(url, e))?;

        response.bytes().await.map_err(|e| Error::upstream(url, e))
    }
}

/// Join a base address and a path with exactly one slash between them
pub fn build_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_with_leading_slash() {
        assert_eq!(
            build_url("http://localhost:3000", "/replicate"),
            "http://localhost:3000/replicate"
        );
    }

    #[test]
    fn test_build_url_without_leading_slash() {
        assert_eq!(
            build_url("http://localhost:3000/", "replicate"),
            "http://localhost:3000/replicate"
        );
    }

    #[test]
    fn test_build_url_with_empty_path() {
        assert_eq!(build_url("http://localhost:3000", ""), "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_upstream_error() {
        let conn = HttpConnection::new(Duration::from_millis(500)).unwrap();
        // Port 9 (discard) is closed on test hosts.
        let err = conn
            .send("http://127.0.0.1:9/query", Bytes::from_static(b"SELECT 1"))
            .await
            .unwrap_err();

        match err {
            Error::Upstream { target, .. } => assert_eq!(target, "http://127.0.0.1:9/query"),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }
}
