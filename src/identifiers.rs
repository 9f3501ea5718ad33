//! Type-safe identifiers for pool entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//! Both IDs are allocated from process-wide atomic counters, so two
//! handles are never equal even when they wrap the same connection.
//!
//! # Identity
//!
//! [`ClientId`] is the key of the handle binding table: the facade hands
//! out opaque client handles, and the only way back to the underlying
//! connection is through this ID. Identity is allocation order, not value
//! equality of the handle's contents.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// ClientId
// ============================================================================

/// Unique identifier of an RPC client handle.
///
/// Allocated when the facade manufactures a handle in `get`. Used as the
/// binding-table key; never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    /// Allocates the next client ID.
    #[must_use]
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

// ============================================================================
// ConnId
// ============================================================================

/// Unique identifier of a pooled transport connection.
///
/// Assigned when the factory produces a connection; survives any number of
/// checkout/release cycles. Used for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

impl ConnId {
    /// Allocates the next connection ID.
    #[must_use]
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ids_unique() {
        let a = ClientId::next();
        let b = ClientId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_conn_ids_unique() {
        let a = ConnId::next();
        let b = ConnId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_format() {
        let id = ClientId(42);
        assert_eq!(id.to_string(), "client-42");

        let id = ConnId(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_ids_are_copy() {
        let id = ClientId::next();
        let copy = id;
        assert_eq!(id, copy);
    }
}
