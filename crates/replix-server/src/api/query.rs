//! POST /query - proxy a query to the primary or a replica

use super::{ApiError, ApiResult};
use crate::PrimaryState;
use axum::extract::State;
use bytes::Bytes;
use replix_core::{Connection, ReplicaClient};
use std::sync::Arc;

/// Execute the query carried in the request body
///
/// Reads (`SELECT ...`) are served from the cache or a replica; everything
/// else goes to the primary. The upstream body is returned unchanged.
pub async fn execute<C: Connection, R: ReplicaClient>(
    State(state): State<Arc<PrimaryState<C, R>>>,
    body: Bytes,
) -> ApiResult<Bytes> {
    let query = decode_query(&body)?;
    Ok(state.proxy.handle_query(query).await?)
}

/// Decode a query body; non-UTF-8 and blank bodies are bad requests
pub fn decode_query(body: &[u8]) -> ApiResult<&str> {
    let query = std::str::from_utf8(body)
        .map_err(|e| ApiError::BadRequest(format!("query is not valid UTF-8: {e}")))?;

    if query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    Ok(query)
}
