//! GET /health

use crate::config::Role;
use crate::{PrimaryState, ReplicaState};
use axum::extract::{Json, State};
use replix_core::{Connection, DurabilityLog, ReplicaClient};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests
    pub status: &'static str,
    /// Node role
    pub role: Role,
    /// Timestamp of the health check
    pub timestamp: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Version information
    pub version: String,
    /// Records appended to this node's log since startup
    pub log_appended: u64,
}

impl HealthResponse {
    fn new(role: Role, started_at: Instant, log: &DurabilityLog) -> Self {
        Self {
            status: "healthy",
            role,
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: started_at.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            log_appended: log.appended(),
        }
    }
}

/// Health of a primary node
pub async fn primary<C: Connection, R: ReplicaClient>(
    State(state): State<Arc<PrimaryState<C, R>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse::new(
        Role::Primary,
        state.started_at,
        state.write_path.log(),
    ))
}

/// Health of a replica node
pub async fn replica(State(state): State<Arc<ReplicaState>>) -> Json<HealthResponse> {
    Json(HealthResponse::new(
        Role::Replica,
        state.started_at,
        &state.log,
    ))
}
