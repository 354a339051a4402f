//! Query routing
//!
//! Reads (queries whose trimmed text starts with `SELECT`, in any case) go to
//! a replica picked round-robin; everything else goes to the primary.

use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Leading keyword that marks a query as read-only
const READ_KEYWORD: &str = "SELECT";

/// Coarse classification of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Served by a replica and cacheable
    Read,
    /// Sent to the primary
    Write,
}

impl QueryKind {
    /// Classify `query` by its leading keyword
    pub fn classify(query: &str) -> Self {
        let head = query.trim_start();
        let is_read = head
            .get(..READ_KEYWORD.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(READ_KEYWORD));

        if is_read { Self::Read } else { Self::Write }
    }

    /// Whether this is a read
    pub fn is_read(self) -> bool {
        self == Self::Read
    }
}

/// Endpoint chosen for a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Query classification
    pub kind: QueryKind,
    /// Target address
    pub target: String,
}

/// Round-robin router over one primary and an ordered replica set
#[derive(Debug)]
pub struct Router {
    primary: String,
    replicas: Arc<[String]>,
    /// Index of the last replica handed out; `None` before the first read
    cursor: Mutex<Option<usize>>,
}

impl Router {
    /// Create a router; at least one replica is required
    pub fn new(primary: impl Into<String>, replicas: Arc<[String]>) -> Result<Self> {
        let primary = primary.into();
        if primary.trim().is_empty() {
            return Err(Error::configuration("primary address must not be empty"));
        }
        if replicas.is_empty() {
            return Err(Error::configuration(
                "router requires at least one replica",
            ));
        }

        Ok(Self {
            primary,
            replicas,
            cursor: Mutex::new(None),
        })
    }

    /// Primary address
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Replica addresses in routing order
    pub fn replicas(&self) -> &[String] {
        &self.replicas
    }

    /// Classify `query` and pick its target
    ///
    /// Only reads advance the round-robin cursor.
    pub fn route(&self, query: &str) -> Route {
        let kind = QueryKind::classify(query);
        let target = match kind {
            QueryKind::Read => self.next_replica().to_string(),
            QueryKind::Write => self.primary.clone(),
        };
        Route { kind, target }
    }

    /// Advance the cursor and return the replica it lands on
    pub fn next_replica(&self) -> &str {
        &self.replicas[self.next_replica_index()]
    }

    fn next_replica_index(&self) -> usize {
        let mut cursor = self.cursor.lock();
        let next = match *cursor {
            Some(last) => (last + 1) % self.replicas.len(),
            None => 0,
        };
        *cursor = Some(next);
        next
    }
}
