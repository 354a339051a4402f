//! GET /stats - pool, cache and replication counters

use crate::PrimaryState;
use axum::extract::{Json, State};
use replix_core::{CacheStats, Connection, PoolStats, ReplicaClient, ReplicationStats};
use serde::Serialize;
use std::sync::Arc;

/// Stats response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Connection pool counters
    pub pool: PoolStats,
    /// Result cache counters
    pub cache: CacheStats,
    /// Replication counters
    pub replication: ReplicationStats,
    /// Records appended to the durability log since startup
    pub log_appended: u64,
}

/// Snapshot every counter
pub async fn get_stats<C: Connection, R: ReplicaClient>(
    State(state): State<Arc<PrimaryState<C, R>>>,
) -> Json<StatsResponse> {
    Json(StatsResponse {
        uptime_seconds: state.started_at.elapsed().as_secs(),
        pool: state.proxy.pool().stats(),
        cache: state.proxy.cache().stats(),
        replication: state.write_path.coordinator().stats(),
        log_appended: state.write_path.log().appended(),
    })
}
