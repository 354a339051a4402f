//! Replica client abstraction
//!
//! The coordinator only needs one primitive: deliver a payload to a replica
//! and learn whether it was accepted. [`HttpReplicaClient`] posts the payload
//! as JSON to `{replica}{replicate_path}`. It sets no request timeout of
//! its own; the coordinator bounds every send with `send_timeout`.

use crate::Result;
use crate::transport::{Connection, HttpConnection, build_url};
use async_trait::async_trait;
use bytes::Bytes;

/// Transport for replica propagation requests
#[async_trait]
pub trait ReplicaClient: Send + Sync + 'static {
    /// Deliver `payload` to `replica`; `Ok` means the replica accepted it
    async fn replicate(&self, replica: &str, payload: Bytes) -> Result<()>;
}

/// HTTP replica client
#[derive(Debug, Clone)]
pub struct HttpReplicaClient {
    conn: HttpConnection,
    path: String,
}

impl HttpReplicaClient {
    /// Create a client posting to `path` on each replica
    pub fn new(path: impl Into<String>) -> Result<Self> {
        Ok(Self {
            conn: HttpConnection::json_unbounded()?,
            path: path.into(),
        })
    }

    /// Full propagation URL for `replica`
    pub fn url_for(&self, replica: &str) -> String {
        build_url(replica, &self.path)
    }
}

#[async_trait]
impl ReplicaClient for HttpReplicaClient {
    async fn replicate(&self, replica: &str, payload: Bytes) -> Result<()> {
        self.conn.send(&self.url_for(replica), payload).await?;
        Ok(())
    }
}
