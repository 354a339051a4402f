//! Replix Core - write-path proxy and replication coordinator
//!
//! This crate provides the building blocks behind a Replix primary:
//! - Bounded connection pool handing out reusable upstream connections
//! - Time-to-live result cache for read queries
//! - Read/write classification and round-robin replica selection
//! - Query proxy combining the three
//! - Durability log for accepted writes
//! - Replication coordinator with async (fire-and-forget) and sync
//!   (all replicas must confirm) propagation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────────────┐
//! │          Proxy           │     │        WritePath         │
//! │ (classify, cache, route) │     │   (log first, then fan)  │
//! └────┬─────────┬───────────┘     └────┬────────────┬────────┘
//!      │         │                      │            │
//! ┌────┴───┐ ┌───┴────┐           ┌─────┴──────┐ ┌───┴─────────────────┐
//! │  Pool  │ │ Cache  │           │ Durability │ │ ReplicationCoord.   │
//! └────┬───┘ └────────┘           │    Log     │ │ (async / sync)      │
//!      │                          └────────────┘ └───┬─────────────────┘
//! ┌────┴────────────────────────────────────────────┴──┐
//! │          Transport (reqwest over HTTP)             │
//! └────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod error;
pub mod pool;
pub mod proxy;
pub mod replication;
pub mod router;
pub mod testing;
pub mod transport;
pub mod wal;
pub mod write_path;

pub use cache::{CacheStats, ResultCache};
pub use config::ProxyConfig;
pub use error::{BoxError, Error, Result};
pub use pool::{ConnectionPool, PoolStats, PooledConnection};
pub use proxy::Proxy;
pub use replication::{
    HttpReplicaClient, ReplicaClient, ReplicationConfig, ReplicationCoordinator, ReplicationMode,
    ReplicationOutcome, ReplicationStats,
};
pub use router::{QueryKind, Route, Router};
pub use transport::{Connection, HttpConnection};
pub use wal::{DurabilityLog, WriteRecord};
pub use write_path::{WritePath, WriteReceipt};
