//! Proxy configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of pooled outbound connections
pub const DEFAULT_POOL_CAPACITY: usize = 10;

/// Default lifetime of a cached read result
pub const DEFAULT_CACHE_TTL_MS: u64 = 5_000;

/// Default per-request timeout for proxied queries
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Whole milliseconds in `duration`, rounding any remainder up
///
/// Saturates at `u64::MAX`.
pub fn duration_to_millis(duration: Duration) -> u64 {
    let millis = duration.as_millis() + u128::from(duration.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

/// Query proxy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Write-authoritative endpoint
    pub primary: String,

    /// Read endpoints, selected round-robin
    pub replicas: Vec<String>,

    /// Number of connections created up front
    pub pool_capacity: usize,

    /// Lifetime of every cached read result, in milliseconds
    pub cache_ttl_ms: u64,

    /// Optional bound on cached entries (unbounded when `None`)
    pub cache_max_entries: Option<usize>,

    /// Timeout applied to each proxied request, in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            primary: "http://127.0.0.1:3000".to_string(),
            replicas: vec!["http://127.0.0.1:3001".to_string()],
            pool_capacity: DEFAULT_POOL_CAPACITY,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            cache_max_entries: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ProxyConfig {
    /// Create a configuration for the given endpoint set
    pub fn new(primary: impl Into<String>, replicas: Vec<String>) -> Self {
        Self {
            primary: primary.into(),
            replicas,
            ..Default::default()
        }
    }

    /// Set the pool capacity
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Set the cache TTL, rounded up to whole milliseconds
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_ms = duration_to_millis(ttl);
        self
    }

    /// Bound the number of cached entries
    pub fn with_cache_max_entries(mut self, max_entries: usize) -> Self {
        self.cache_max_entries = Some(max_entries);
        self
    }

    /// Cache TTL as a duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.primary.trim().is_empty() {
            return Err(Error::configuration("primary address must not be empty"));
        }

        if self.replicas.is_empty() {
            return Err(Error::configuration(
                "at least one replica is required to serve reads",
            ));
        }

        if self.replicas.iter().any(|r| r.trim().is_empty()) {
            return Err(Error::configuration("replica addresses must not be empty"));
        }

        if self.pool_capacity == 0 {
            return Err(Error::configuration("pool_capacity must be at least 1"));
        }

        if self.cache_ttl_ms == 0 {
            return Err(Error::configuration("cache_ttl_ms must be positive"));
        }

        if self.cache_max_entries == Some(0) {
            return Err(Error::configuration(
                "cache_max_entries must be at least 1 when set",
            ));
        }

        if self.request_timeout_ms == 0 {
            return Err(Error::configuration("request_timeout_ms must be positive"));
        }

        Ok(())
    }
}
