//! Replication of committed writes to replicas
//!
//! ```text
//! ┌─────────────────┐   POST /replicate   ┌─────────────────┐
//! │                 │ ──────────────────► │    Replica 1    │
//! │     Primary     │                     └─────────────────┘
//! │  (durable log)  │   POST /replicate   ┌─────────────────┐
//! │                 │ ──────────────────► │    Replica 2    │
//! └─────────────────┘                     └─────────────────┘
//! ```
//!
//! # Replication Modes
//!
//! - **Async**: the write is acknowledged once it is durable locally;
//!   replica sends run detached (default)
//! - **Sync**: the write is acknowledged only after every replica confirmed;
//!   any failure or timeout is reported as a partial replication failure

pub mod client;
pub mod config;
pub mod coordinator;

pub use client::{HttpReplicaClient, ReplicaClient};
pub use config::{ReplicationConfig, ReplicationMode};
pub use coordinator::{ReplicaAck, ReplicationCoordinator, ReplicationOutcome, ReplicationStats};

/// Default path replicas accept propagated writes on
pub const DEFAULT_REPLICATE_PATH: &str = "/replicate";

/// Default upper bound on a single replica send, in milliseconds
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 5_000;
