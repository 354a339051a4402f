//! In-memory replica client with scripted per-replica behaviour

use crate::replication::ReplicaClient;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How a mock replica answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaBehavior {
    /// Accept immediately
    Accept,
    /// Fail immediately
    Reject,
    /// Accept after the given delay
    Delay(Duration),
    /// Never answer
    Hang,
}

/// Replica client that records every payload it receives
pub struct MockReplicaClient {
    behaviors: HashMap<String, ReplicaBehavior>,
    default: ReplicaBehavior,
    received: Mutex<Vec<(String, Bytes)>>,
    completed: AtomicUsize,
}

impl MockReplicaClient {
    /// Client whose replicas all accept
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            default: ReplicaBehavior::Accept,
            received: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        }
    }

    /// Behaviour for replicas without an explicit entry
    pub fn with_default(mut self, behavior: ReplicaBehavior) -> Self {
        self.default = behavior;
        self
    }

    /// Behaviour for one replica
    pub fn with(mut self, replica: &str, behavior: ReplicaBehavior) -> Self {
        self.behaviors.insert(replica.to_string(), behavior);
        self
    }

    /// Every (replica, payload) pair received so far
    pub fn received(&self) -> Vec<(String, Bytes)> {
        self.received.lock().clone()
    }

    /// Sends that ran to completion, accepted or rejected
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl Default for MockReplicaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplicaClient for MockReplicaClient {
    async fn replicate(&self, replica: &str, payload: Bytes) -> Result<()> {
        self.received.lock().push((replica.to_string(), payload));
        let behavior = self
            .behaviors
            .get(replica)
            .copied()
            .unwrap_or(self.default);

        let result = match behavior {
            ReplicaBehavior::Accept => Ok(()),
            ReplicaBehavior::Reject => Err(Error::upstream(replica, "replica rejected write")),
            ReplicaBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            ReplicaBehavior::Hang => std::future::pending().await,
        };

        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}
