//! Replix Server - HTTP front end for the query proxy and write path
//!
//! A primary node provides:
//! - POST /query - Proxy a query (reads to replicas, writes to the primary)
//! - POST /write/async - Durable write, replication in the background
//! - POST /write/sync - Durable write confirmed by every replica
//! - GET /stats - Pool, cache and replication counters
//! - POST /cache/clear - Drop cached read results
//! - GET /health - Health check
//!
//! A replica node provides:
//! - POST /replicate - Append a propagated write to the local log
//! - GET /health - Health check

use axum::{
    Router,
    routing::{get, post},
};
use replix_core::{
    Connection, DurabilityLog, HttpConnection, HttpReplicaClient, Proxy, ReplicaClient,
    ReplicationCoordinator, WritePath,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;

use config::{Config, Role};

/// Shared state of a primary node
pub struct PrimaryState<C: Connection = HttpConnection, R: ReplicaClient = HttpReplicaClient> {
    /// Query proxy
    pub proxy: Arc<Proxy<C>>,
    /// Durability log and replication coordinator
    pub write_path: WritePath<R>,
    /// Process start, for uptime
    pub started_at: Instant,
}

impl<C: Connection, R: ReplicaClient> PrimaryState<C, R> {
    /// Create primary state
    pub fn new(proxy: Arc<Proxy<C>>, write_path: WritePath<R>) -> Self {
        Self {
            proxy,
            write_path,
            started_at: Instant::now(),
        }
    }
}

/// Shared state of a replica node
pub struct ReplicaState {
    /// Log receiving replicated writes
    pub log: Arc<DurabilityLog>,
    /// Process start, for uptime
    pub started_at: Instant,
}

impl ReplicaState {
    /// Create replica state
    pub fn new(log: Arc<DurabilityLog>) -> Self {
        Self {
            log,
            started_at: Instant::now(),
        }
    }
}

/// Replix server, one variant per role
pub enum ReplixServer<C: Connection = HttpConnection, R: ReplicaClient = HttpReplicaClient> {
    /// Primary node
    Primary(Arc<PrimaryState<C, R>>),
    /// Replica node
    Replica(Arc<ReplicaState>),
}

impl ReplixServer {
    /// Build the node described by `config`
    ///
    /// Opens (or creates) the durability log under `config.data_dir`.
    pub fn from_config(config: &Config) -> replix_core::Result<Self> {
        let log = Arc::new(DurabilityLog::open(config.log_path(), config.fsync)?);

        match config.role {
            Role::Primary => {
                let proxy = Proxy::from_config(&config.proxy)?;
                let replication = &config.replication;
                let client = HttpReplicaClient::new(replication.replicate_path.clone())?;
                let coordinator = ReplicationCoordinator::new(replication, Arc::new(client))?;
                let write_path = WritePath::new(log, Arc::new(coordinator));

                tracing::info!(
                    primary = %config.proxy.primary,
                    read_replicas = config.proxy.replicas.len(),
                    replicas = replication.replicas.len(),
                    "Primary node configured"
                );
                Ok(Self::primary(PrimaryState::new(Arc::new(proxy), write_path)))
            }
            Role::Replica => {
                tracing::info!("Replica node configured");
                Ok(Self::replica(ReplicaState::new(log)))
            }
        }
    }
}

impl<C: Connection, R: ReplicaClient> ReplixServer<C, R> {
    /// Wrap primary state
    pub fn primary(state: PrimaryState<C, R>) -> Self {
        Self::Primary(Arc::new(state))
    }

    /// Wrap replica state
    pub fn replica(state: ReplicaState) -> Self {
        Self::Replica(Arc::new(state))
    }

    /// Role served by this node
    pub fn role(&self) -> Role {
        match self {
            Self::Primary(_) => Role::Primary,
            Self::Replica(_) => Role::Replica,
        }
    }

    /// HTTP routes for this node's role
    pub fn router(&self) -> Router {
        let router = match self {
            Self::Primary(state) => Router::new()
                .route("/query", post(api::query::execute::<C, R>))
                .route("/write/async", post(api::write::write_async::<C, R>))
                .route("/write/sync", post(api::write::write_sync::<C, R>))
                .route("/stats", get(api::stats::get_stats::<C, R>))
                .route("/cache/clear", post(api::cache::clear::<C, R>))
                .route("/health", get(api::health::primary::<C, R>))
                .with_state(state.clone()),
            Self::Replica(state) => Router::new()
                .route("/replicate", post(api::replicate::receive))
                .route("/health", get(api::health::replica))
                .with_state(state.clone()),
        };

        router.layer(TraceLayer::new_for_http())
    }
}
