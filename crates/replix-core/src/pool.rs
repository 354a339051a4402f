//! Bounded connection pool with non-blocking acquire
//!
//! All connections are created when the pool is built. `acquire` either
//! hands out an idle connection or fails with [`Error::PoolExhausted`];
//! it never waits. `release` re-admits a connection only while the idle
//! set is below capacity, so a double release cannot grow the pool.

use crate::{Error, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

/// Pool counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Configured capacity
    pub capacity: usize,
    /// Idle connections right now
    pub idle: usize,
    /// Successful acquisitions
    pub acquired: u64,
    /// Acquisitions refused because no connection was idle
    pub exhausted: u64,
    /// Connections returned to the idle set
    pub released: u64,
    /// Releases dropped because the idle set was already full
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    acquired: AtomicU64,
    exhausted: AtomicU64,
    released: AtomicU64,
    dropped: AtomicU64,
}

/// Fixed-capacity pool of reusable connections
pub struct ConnectionPool<C> {
    idle: Mutex<Vec<C>>,
    capacity: usize,
    counters: Counters,
}

impl<C> ConnectionPool<C> {
    /// Create a pool holding `capacity` connections built by `factory`
    pub fn new(capacity: usize, mut factory: impl FnMut() -> C) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::configuration("pool capacity must be at least 1"));
        }

        let idle = (0..capacity).map(|_| factory()).collect();

        Ok(Self {
            idle: Mutex::new(idle),
            capacity,
            counters: Counters::default(),
        })
    }

    /// Take an idle connection, failing immediately if none is available
    pub fn acquire(&self) -> Result<C> {
        let conn = self.idle.lock().pop();

        match conn {
            Some(conn) => {
                self.counters.acquired.fetch_add(1, Ordering::Relaxed);
                Ok(conn)
            }
            None => {
                self.counters.exhausted.fetch_add(1, Ordering::Relaxed);
                Err(Error::PoolExhausted {
                    capacity: self.capacity,
                })
            }
        }
    }

    /// Return a connection to the pool
    ///
    /// Returns `false` when the idle set is already full and the connection
    /// was dropped instead.
    pub fn release(&self, conn: C) -> bool {
        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(conn);
            drop(idle);
            self.counters.released.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            drop(idle);
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                capacity = self.capacity,
                "Dropping released connection, pool already full"
            );
            false
        }
    }

    /// Acquire a connection wrapped in a guard that releases it on drop
    pub fn checkout(&self) -> Result<PooledConnection<'_, C>> {
        let conn = self.acquire()?;
        Ok(PooledConnection {
            pool: self,
            conn: Some(conn),
        })
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of idle connections
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            idle: self.idle(),
            acquired: self.counters.acquired.load(Ordering::Relaxed),
            exhausted: self.counters.exhausted.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Checked-out connection that goes back to its pool when dropped
pub struct PooledConnection<'a, C> {
    pool: &'a ConnectionPool<C>,
    conn: Option<C>,
}

impl<C> Deref for PooledConnection<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        // Only `Drop` takes the connection out.
        self.conn.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<C> DerefMut for PooledConnection<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<C> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
