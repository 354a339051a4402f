//! POST /cache/clear

use crate::PrimaryState;
use axum::extract::{Json, State};
use replix_core::{Connection, ReplicaClient};
use serde::Serialize;
use std::sync::Arc;

/// Cache clear response
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    /// Entries removed, expired ones included
    pub cleared: usize,
}

/// Drop every cached read result
pub async fn clear<C: Connection, R: ReplicaClient>(
    State(state): State<Arc<PrimaryState<C, R>>>,
) -> Json<ClearResponse> {
    let cleared = state.proxy.cache().clear();
    tracing::info!(cleared, "Result cache cleared");
    Json(ClearResponse { cleared })
}
