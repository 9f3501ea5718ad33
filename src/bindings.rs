//! Handle-to-connection binding table.
//!
//! An [`RpcClient`](crate::RpcClient) handle carries no reference back to
//! the pooled connection it was built from, so the facade keeps this side
//! table to translate handle-level release decisions into connection-level
//! pool operations.
//!
//! # Invariants
//!
//! - A binding is created exactly once, before the handle reaches the
//!   caller, and never mutated.
//! - A binding is removed exactly once: [`BindingTable::take`] is an
//!   atomic lookup-and-remove, so two racing release paths for the same
//!   handle resolve to one winner; the loser observes `None`.
//! - The table is the owner of a checked-out connection's wrapper; taking
//!   the binding transfers that ownership to the release path.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::identifiers::ClientId;
use crate::transport::PooledConn;

// ============================================================================
// BindingTable
// ============================================================================

/// Concurrency-safe map from handle identity to pooled connection.
///
/// One mutex guards the map; entries for different handles are
/// independent, and a single entry is only ever taken by the release path
/// that wins the race for it.
#[derive(Default)]
pub(crate) struct BindingTable {
    /// Live bindings for checked-out connections.
    entries: Mutex<FxHashMap<ClientId, PooledConn>>,
}

impl BindingTable {
    /// Creates an empty table.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records that `client_id`'s handle was built from `conn`.
    ///
    /// Duplicate insertion for one handle identity cannot occur in the
    /// facade's usage pattern; it is a programmer error and asserted in
    /// debug builds.
    pub(crate) fn bind(&self, client_id: ClientId, conn: PooledConn) {
        trace!(%client_id, conn_id = %conn.id(), "Handle bound");
        let previous = self.entries.lock().insert(client_id, conn);
        debug_assert!(previous.is_none(), "duplicate binding for {client_id}");
    }

    /// Atomically removes and returns the binding, if present.
    pub(crate) fn take(&self, client_id: ClientId) -> Option<PooledConn> {
        let conn = self.entries.lock().remove(&client_id);
        if let Some(ref conn) = conn {
            trace!(%client_id, conn_id = %conn.id(), "Handle unbound");
        }
        conn
    }

    /// Returns `true` if `client_id` currently has a binding.
    #[inline]
    pub(crate) fn contains(&self, client_id: ClientId) -> bool {
        self.entries.lock().contains_key(&client_id)
    }

    /// Returns the number of live bindings.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

// ============================================================================
// Tests
// ============================================================================
