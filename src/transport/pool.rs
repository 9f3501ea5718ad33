//! Bounded transport connection pool engine.
//!
//! Factory-driven creation, idle-connection storage, and capacity
//! bounding for [`PooledConn`]s. The facade layers handle manufacture and
//! binding on top; this engine only moves connections between three
//! states:
//!
//! ```text
//! ┌─────────┐  acquire   ┌─────────────┐  put      ┌─────────┐
//! │  idle   │───────────►│ checked out │──────────►│  idle   │
//! │  queue  │            │ (caller)    │  discard  └─────────┘
//! └─────────┘            └─────────────┘──────────► closed
//! ```
//!
//! # Capacity
//!
//! `max_cap` bounds live connections (idle + checked out) through a
//! semaphore. `acquire` waits for a slot, then reuses an idle connection
//! or dials a new one through the factory; `put` and `discard` free the
//! slot. A discarded connection is consumed and can never re-enter the
//! idle queue.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, info, trace};

use crate::error::{Error, Result};

use super::conn::{ConnFactory, PooledConn};

// ============================================================================
// ConnPool
// ============================================================================

/// Bounded pool of reusable transport connections.
pub(crate) struct ConnPool {
    /// Produces a new raw transport when no idle connection is available.
    factory: ConnFactory,

    /// Reusable connections, oldest first.
    idle: Mutex<VecDeque<PooledConn>>,

    /// Capacity slots; one held (forgotten) per checked-out connection.
    slots: Semaphore,

    /// Set once by `close`; checked under the idle lock on `put`.
    closed: AtomicBool,
}

impl std::fmt::Debug for ConnPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnPool")
            .field("idle", &self.idle.lock().len())
            .field("slots", &self.slots.available_permits())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl ConnPool {
    /// Creates a pool and dials the initial connections.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `max_cap` is zero or `initial_cap > max_cap`
    /// - the factory's error if any initial dial fails; connections dialed
    ///   before the failure are shut down
    pub(crate) async fn new(
        initial_cap: usize,
        max_cap: usize,
        factory: ConnFactory,
    ) -> Result<Self> {
        if max_cap == 0 || initial_cap > max_cap {
            return Err(Error::config(format!(
                "invalid capacity settings: initial {initial_cap}, max {max_cap}"
            )));
        }

        let pool = Self {
            factory,
            idle: Mutex::new(VecDeque::with_capacity(initial_cap)),
            slots: Semaphore::new(max_cap),
            closed: AtomicBool::new(false),
        };

        for _ in 0..initial_cap {
            match (pool.factory)().await {
                Ok(raw) => pool.idle.lock().push_back(PooledConn::new(raw)),
                Err(e) => {
                    pool.close().await;
                    return Err(e);
                }
            }
        }

        info!(initial_cap, max_cap, "Connection pool created");
        Ok(pool)
    }

    /// Acquires a connection, waiting for capacity if necessary.
    ///
    /// Reuses the oldest idle connection when one exists; otherwise dials
    /// a new one through the factory. Factory errors free the capacity
    /// slot and propagate unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolClosed`] if the pool is closed (including while
    ///   waiting for capacity)
    /// - any factory error
    pub(crate) async fn acquire(&self) -> Result<PooledConn> {
        let permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| Error::PoolClosed)?;
        permit.forget();

        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::PoolClosed);
        }

        if let Some(conn) = self.idle.lock().pop_front() {
            trace!(conn_id = %conn.id(), "Reusing idle connection");
            return Ok(conn);
        }

        match (self.factory)().await {
            Ok(raw) => Ok(PooledConn::new(raw)),
            Err(e) => {
                self.free_slot();
                Err(e)
            }
        }
    }

    /// Returns a connection to the idle queue as reusable.
    ///
    /// On a closed pool the connection is shut down instead.
    pub(crate) async fn put(&self, conn: PooledConn) {
        {
            let mut idle = self.idle.lock();
            if !self.closed.load(Ordering::SeqCst) {
                trace!(conn_id = %conn.id(), "Connection returned to pool");
                idle.push_back(conn);
                drop(idle);
                self.slots.add_permits(1);
                return;
            }
        }

        conn.shutdown().await;
    }

    /// Permanently removes a connection from circulation and closes it.
    ///
    /// Frees the capacity slot, so a waiting acquirer can dial a
    /// replacement.
    pub(crate) async fn discard(&self, conn: PooledConn) {
        debug!(conn_id = %conn.id(), "Connection discarded");
        conn.shutdown().await;
        self.free_slot();
    }

    /// Closes the pool: shuts down all idle connections and fails current
    /// and future acquirers with [`Error::PoolClosed`]. Idempotent.
    ///
    /// Checked-out connections are not reclaimed; they are shut down when
    /// their holder returns them.
    pub(crate) async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.slots.close();

        let drained: Vec<PooledConn> = {
            let mut idle = self.idle.lock();
            idle.drain(..).collect()
        };
        let count = drained.len();
        for conn in drained {
            conn.shutdown().await;
        }

        info!(idle_closed = count, "Connection pool closed");
    }

    /// Returns the current idle (reusable) connection count.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.idle.lock().len()
    }

    /// Returns `true` once `close` has run.
    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Gives a capacity slot back after a discard or a failed dial.
    fn free_slot(&self) {
        if !self.closed.load(Ordering::SeqCst) {
            self.slots.add_permits(1);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
