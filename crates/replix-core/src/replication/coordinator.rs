//! Replication coordinator
//!
//! Propagates a committed write to every replica in one of two modes:
//!
//! - **Async**: one detached task per replica; the caller gets control back
//!   immediately and outcomes are only logged and counted.
//! - **Sync**: one task per replica, all reporting to a shared channel. The
//!   caller waits for exactly one outcome per replica and succeeds only if
//!   every replica confirmed. Each send is bounded by the configured
//!   timeout, so a silent replica counts as a failure instead of stalling
//!   the write.

use crate::replication::client::ReplicaClient;
use crate::replication::config::{ReplicationConfig, ReplicationMode};
use crate::{Error, Result};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Outcome reported by one replica during a synchronous round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaAck {
    /// Position of the replica in the configured list
    pub index: usize,
    /// Replica address
    pub replica: String,
    /// Whether the replica accepted the write
    pub confirmed: bool,
}

/// Result of a successful propagation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationOutcome {
    /// Async mode: sends were dispatched and not awaited
    Dispatched {
        /// Number of replica sends started
        replicas: usize,
    },
    /// Sync mode: every replica confirmed
    Committed {
        /// Number of confirmations received
        confirmed: usize,
    },
}

/// Coordinator statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplicationStats {
    /// Replica sends started in async mode
    pub async_dispatched: u64,
    /// Synchronous rounds started
    pub sync_rounds: u64,
    /// Synchronous rounds that ended with at least one failure
    pub sync_partial_failures: u64,
    /// Sends a replica accepted
    pub acks: u64,
    /// Sends that returned an error
    pub failures: u64,
    /// Sends that exceeded the timeout
    pub timeouts: u64,
}

#[derive(Debug, Default)]
struct Counters {
    async_dispatched: AtomicU64,
    sync_rounds: AtomicU64,
    sync_partial_failures: AtomicU64,
    acks: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
}

/// Fans writes out to the configured replicas
pub struct ReplicationCoordinator<R: ReplicaClient> {
    replicas: Arc<[String]>,
    client: Arc<R>,
    send_timeout: Duration,
    counters: Arc<Counters>,
}

impl<R: ReplicaClient> ReplicationCoordinator<R> {
    /// Create a coordinator; the replica list must not be empty
    pub fn new(config: &ReplicationConfig, client: Arc<R>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            replicas: config.replicas.clone().into(),
            client,
            send_timeout: config.send_timeout(),
            counters: Arc::new(Counters::default()),
        })
    }

    /// Replica addresses
    pub fn replicas(&self) -> &[String] {
        &self.replicas
    }

    /// Per-send timeout
    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Propagate `payload` in the requested mode
    pub async fn propagate(
        &self,
        payload: Bytes,
        mode: ReplicationMode,
    ) -> Result<ReplicationOutcome> {
        match mode {
            ReplicationMode::Async => Ok(ReplicationOutcome::Dispatched {
                replicas: self.propagate_async(payload)?,
            }),
            ReplicationMode::Sync => {
                let confirmed = self.propagate_sync(payload).await?;
                Ok(ReplicationOutcome::Committed { confirmed })
            }
        }
    }

    /// Start one detached send per replica and return without waiting
    ///
    /// The sends run on the current Tokio runtime. Called outside one, this
    /// returns [`Error::Internal`] and dispatches nothing.
    pub fn propagate_async(&self, payload: Bytes) -> Result<usize> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::internal(format!("async replication needs a runtime: {e}")))?;

        for replica in self.replicas.iter() {
            let client = self.client.clone();
            let counters = self.counters.clone();
            let replica = replica.clone();
            let payload = payload.clone();
            let timeout = self.send_timeout;

            runtime.spawn(async move {
                deliver(&*client, &counters, &replica, payload, timeout).await;
            });
        }

        let dispatched = self.replicas.len();
        self.counters
            .async_dispatched
            .fetch_add(dispatched as u64, Ordering::Relaxed);
        tracing::debug!(replicas = dispatched, "Dispatched async replication");
        Ok(dispatched)
    }

    /// Send to every replica concurrently and wait for all outcomes
    ///
    /// Returns the number of confirmations when every replica accepted the
    /// write, or [`Error::PartialReplication`] naming the replicas that
    /// failed or timed out.
    pub async fn propagate_sync(&self, payload: Bytes) -> Result<usize> {
        let total = self.replicas.len();
        self.counters.sync_rounds.fetch_add(1, Ordering::Relaxed);

        let (tx, mut rx) = mpsc::channel::<ReplicaAck>(total);

        for (index, replica) in self.replicas.iter().enumerate() {
            let tx = tx.clone();
            let client = self.client.clone();
            let counters = self.counters.clone();
            let replica = replica.clone();
            let payload = payload.clone();
            let timeout = self.send_timeout;

            tokio::spawn(async move {
                let confirmed = deliver(&*client, &counters, &replica, payload, timeout).await;
                let _ = tx
                    .send(ReplicaAck {
                        index,
                        replica,
                        confirmed,
                    })
                    .await;
            });
        }
        drop(tx);

        let mut confirmed_by = vec![false; total];
        let mut received = 0;
        while received < total {
            // `None` means every sender is gone; a task that died without
            // reporting leaves its slot unconfirmed.
            let Some(ack) = rx.recv().await else { break };
            confirmed_by[ack.index] = ack.confirmed;
            received += 1;
        }

        let failed: Vec<String> = confirmed_by
            .iter()
            .zip(self.replicas.iter())
            .filter(|(confirmed, _)| !**confirmed)
            .map(|(_, replica)| replica.clone())
            .collect();
        let confirmed = total - failed.len();

        if failed.is_empty() {
            tracing::info!(replicas = total, "All replicas confirmed write");
            Ok(confirmed)
        } else {
            self.counters
                .sync_partial_failures
                .fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                confirmed,
                total,
                failed = ?failed,
                "Synchronous replication incomplete"
            );
            Err(Error::PartialReplication {
                confirmed,
                total,
                failed,
            })
        }
    }

    /// Single bounded send to `replica`; `true` when it was accepted
    pub async fn send_to_replica(&self, replica: &str, payload: Bytes) -> bool {
        deliver(&*self.client, &self.counters, replica, payload, self.send_timeout).await
    }

    /// Snapshot of the coordinator counters
    pub fn stats(&self) -> ReplicationStats {
        let c = &self.counters;
        ReplicationStats {
            async_dispatched: c.async_dispatched.load(Ordering::Relaxed),
            sync_rounds: c.sync_rounds.load(Ordering::Relaxed),
            sync_partial_failures: c.sync_partial_failures.load(Ordering::Relaxed),
            acks: c.acks.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            timeouts: c.timeouts.load(Ordering::Relaxed),
        }
    }
}

async fn deliver<R: ReplicaClient + ?Sized>(
    client: &R,
    counters: &Counters,
    replica: &str,
    payload: Bytes,
    timeout: Duration,
) -> bool {
    match tokio::time::timeout(timeout, client.replicate(replica, payload)).await {
        Ok(Ok(())) => {
            counters.acks.fetch_add(1, Ordering::Relaxed);
            tracing::info!(replica = %replica, "Replicated successfully");
            true
        }
        Ok(Err(e)) if !e.is_timeout() => {
            counters.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(replica = %replica, "Failed to replicate: {}", e);
            false
        }
        _ => {
            counters.timeouts.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                replica = %replica,
                timeout_ms = crate::config::duration_to_millis(timeout),
                "Replication timed out"
            );
            false
        }
    }
}
