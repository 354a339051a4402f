//! Error types for Replix Core

use thiserror::Error;

/// Result type alias using Replix Error
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by upstream failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error types for the proxy and replication paths
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors from the durability log
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid construction parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No idle connection in the pool
    #[error("Connection pool exhausted (capacity {capacity})")]
    PoolExhausted {
        /// Configured pool capacity
        capacity: usize,
    },

    /// The proxy could not obtain a connection for a query
    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// Transport failure talking to the primary or a replica
    #[error("Upstream error from {target}: {source}")]
    Upstream {
        /// Address of the endpoint that failed
        target: String,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// Synchronous replication did not reach every replica
    #[error("Partial replication failure: {confirmed}/{total} replicas confirmed")]
    PartialReplication {
        /// Replicas that acknowledged the write
        confirmed: usize,
        /// Replicas the write was sent to
        total: usize,
        /// Addresses of the replicas that failed or timed out
        failed: Vec<String>,
    },

    /// The local durability write failed
    #[error("Durability error: {0}")]
    Durability(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a durability error
    pub fn durability(msg: impl Into<String>) -> Self {
        Self::Durability(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Wrap a transport failure for `target`
    pub fn upstream(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Upstream {
            target: target.into(),
            source: source.into(),
        }
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Configuration(_) => "configuration",
            Self::PoolExhausted { .. } => "pool_exhausted",
            Self::ConnectionUnavailable(_) => "connection_unavailable",
            Self::Upstream { .. } => "upstream",
            Self::PartialReplication { .. } => "partial_replication",
            Self::Durability(_) => "durability",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether a caller may retry the same operation later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted { .. } | Self::ConnectionUnavailable(_)
        )
    }

    /// Whether an upstream failure was the transport giving up on time
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Upstream { source, .. } => source
                .downcast_ref::<reqwest::Error>()
                .is_some_and(reqwest::Error::is_timeout),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::upstream("http://primary:5432", io);

        assert_eq!(err.kind(), "upstream");
        let source = std::error::Error::source(&err).expect("source is kept");
        assert_eq!(source.to_string(), "refused");
        assert!(err.to_string().contains("http://primary:5432"));
    }

    #[test]
    fn test_partial_replication_message() {
        let err = Error::PartialReplication {
            confirmed: 2,
            total: 3,
            failed: vec!["http://r3".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Partial replication failure: 2/3 replicas confirmed"
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_kinds() {
        assert!(Error::PoolExhausted { capacity: 4 }.is_transient());
        assert!(Error::ConnectionUnavailable("busy".into()).is_transient());
        assert!(!Error::configuration("bad").is_transient());
    }

    #[test]
    fn test_only_transport_timeouts_are_timeouts() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        assert!(!Error::upstream("http://r1", io).is_timeout());
        assert!(!Error::internal("late").is_timeout());
    }
}
