//! Write endpoints
//!
//! - POST /write/async - durable locally, replication in the background
//! - POST /write/sync - durable locally and confirmed by every replica

use super::{ApiError, ApiResult};
use crate::PrimaryState;
use axum::{
    extract::State,
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use replix_core::{Connection, ReplicaClient, ReplicationMode, WriteReceipt, WriteRecord};
use std::sync::Arc;

/// Body returned by an accepted async write
pub const ASYNC_ACCEPTED: &str = "Write successful (replication in progress)";

/// Body returned by a fully replicated sync write
pub const SYNC_COMMITTED: &str = "All replicas confirmed. Write committed.";

/// Header carrying the write identifier
pub const WRITE_ID_HEADER: &str = "x-replix-write-id";

/// Decode a write record, reporting malformed bodies as 400
pub fn decode_record(body: &[u8]) -> ApiResult<WriteRecord> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Accept a write and replicate it without waiting for replicas
pub async fn write_async<C: Connection, R: ReplicaClient>(
    State(state): State<Arc<PrimaryState<C, R>>>,
    body: Bytes,
) -> ApiResult<Response> {
    let record = decode_record(&body)?;
    let receipt = state
        .write_path
        .submit(record, ReplicationMode::Async)
        .await?;
    Ok(accepted(&receipt, ASYNC_ACCEPTED))
}

/// Accept a write once every replica confirmed it
pub async fn write_sync<C: Connection, R: ReplicaClient>(
    State(state): State<Arc<PrimaryState<C, R>>>,
    body: Bytes,
) -> ApiResult<Response> {
    let record = decode_record(&body)?;
    let receipt = state.write_path.submit(record, ReplicationMode::Sync).await?;
    Ok(accepted(&receipt, SYNC_COMMITTED))
}

fn accepted(receipt: &WriteReceipt, message: &'static str) -> Response {
    let mut response = message.into_response();
    if let Ok(value) = HeaderValue::from_str(&receipt.write_id.to_string()) {
        response.headers_mut().insert(WRITE_ID_HEADER, value);
    }
    response
}
