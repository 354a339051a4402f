//! Write path - local durability first, then replication
//!
//! A write is appended to the durability log before anything is sent to a
//! replica. If the append fails nothing is propagated. Once the append
//! succeeds the write stays durable locally whatever replication reports.

use crate::replication::{
    HttpReplicaClient, ReplicaClient, ReplicationCoordinator, ReplicationMode, ReplicationOutcome,
};
use crate::wal::{DurabilityLog, WriteRecord};
use crate::{Error, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Acknowledgement returned for an accepted write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Identifier used to correlate log lines for this write
    pub write_id: Uuid,
    /// Mode the write was propagated with
    pub mode: ReplicationMode,
    /// Replication result
    pub outcome: ReplicationOutcome,
}

/// Durability log plus replication coordinator
pub struct WritePath<R: ReplicaClient = HttpReplicaClient> {
    log: Arc<DurabilityLog>,
    coordinator: Arc<ReplicationCoordinator<R>>,
}

impl<R: ReplicaClient> Clone for WritePath<R> {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<R: ReplicaClient> WritePath<R> {
    /// Create a write path
    pub fn new(log: Arc<DurabilityLog>, coordinator: Arc<ReplicationCoordinator<R>>) -> Self {
        Self { log, coordinator }
    }

    /// Persist `record` locally, then propagate it in `mode`
    ///
    /// In sync mode a [`Error::PartialReplication`] means the record is
    /// durable locally but not on every replica.
    pub async fn submit(&self, record: WriteRecord, mode: ReplicationMode) -> Result<WriteReceipt> {
        let write_id = Uuid::new_v4();
        let payload = record.to_payload()?;

        let log = self.log.clone();
        tokio::task::spawn_blocking(move || log.append(&record))
            .await
            .map_err(|e| Error::internal(format!("durability task failed: {e}")))??;

        tracing::debug!(%write_id, %mode, "Write persisted locally");

        let outcome = self
            .coordinator
            .propagate(payload, mode)
            .await
            .inspect_err(|e| tracing::warn!(%write_id, "Write not fully replicated: {}", e))?;

        Ok(WriteReceipt {
            write_id,
            mode,
            outcome,
        })
    }

    /// Durability log
    pub fn log(&self) -> &DurabilityLog {
        &self.log
    }

    /// Replication coordinator
    pub fn coordinator(&self) -> &ReplicationCoordinator<R> {
        &self.coordinator
    }
}
