//! POST /replicate - receive a write propagated by the primary

use super::ApiResult;
use super::write::decode_record;
use crate::ReplicaState;
use axum::extract::State;
use bytes::Bytes;
use replix_core::Error;
use std::sync::Arc;

/// Body returned once a replicated write is durable on this node
pub const REPLICATED: &str = "Replicated";

/// Append the propagated record to this replica's log
pub async fn receive(
    State(state): State<Arc<ReplicaState>>,
    body: Bytes,
) -> ApiResult<&'static str> {
    let record = decode_record(&body)?;

    let log = state.log.clone();
    tokio::task::spawn_blocking(move || log.append(&record))
        .await
        .map_err(|e| Error::internal(format!("durability task failed: {e}")))??;

    tracing::debug!(appended = state.log.appended(), "Applied replicated write");
    Ok(REPLICATED)
}
