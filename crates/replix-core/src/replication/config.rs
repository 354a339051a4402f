//! Replication configuration

use crate::config::duration_to_millis;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Replication mode, chosen per write by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationMode {
    /// Async replication - don't wait for replica ACKs
    #[default]
    Async,
    /// Sync replication - wait for every replica to ACK
    Sync,
}

impl fmt::Display for ReplicationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Async => f.write_str("async"),
            Self::Sync => f.write_str("sync"),
        }
    }
}

impl FromStr for ReplicationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "async" => Ok(Self::Async),
            "sync" => Ok(Self::Sync),
            other => Err(Error::configuration(format!(
                "unknown replication mode '{other}'"
            ))),
        }
    }
}

/// Replication configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Replica base addresses that receive every write
    pub replicas: Vec<String>,

    /// Path appended to each replica address for propagation requests
    pub replicate_path: String,

    /// Upper bound on a single replica send, in milliseconds
    pub send_timeout_ms: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            replicas: vec!["http://127.0.0.1:3001".to_string()],
            replicate_path: super::DEFAULT_REPLICATE_PATH.to_string(),
            send_timeout_ms: super::DEFAULT_SEND_TIMEOUT_MS,
        }
    }
}

impl ReplicationConfig {
    /// Create a configuration for the given replicas
    pub fn new(replicas: Vec<String>) -> Self {
        Self {
            replicas,
            ..Default::default()
        }
    }

    /// Set the per-send timeout, rounded up to whole milliseconds
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout_ms = duration_to_millis(timeout);
        self
    }

    /// Set the propagation path
    pub fn with_replicate_path(mut self, path: impl Into<String>) -> Self {
        self.replicate_path = path.into();
        self
    }

    /// Per-send timeout as a duration
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.replicas.is_empty() {
            return Err(Error::configuration(
                "replication requires at least one replica",
            ));
        }

        if self.replicas.iter().any(|r| r.trim().is_empty()) {
            return Err(Error::configuration("replica addresses must not be empty"));
        }

        if self.send_timeout_ms == 0 {
            return Err(Error::configuration("send_timeout_ms must be positive"));
        }

        Ok(())
    }
}
