//! Protocol driver registry.
//!
//! A driver adapts a pooled connection's stream into a protocol-specific
//! [`RpcClient`]. The registry maps protocol names to drivers so one pool
//! implementation can serve multiple wire encodings.
//!
//! # Registration Policy
//!
//! First writer wins: registering a name that already exists is a silent
//! no-op. Initialization code on concurrent startup paths may therefore
//! register idempotently without coordination.
//!
//! # Global vs. Explicit
//!
//! [`DriverRegistry::global`] is the process-wide instance with the
//! built-in `gob` and `json` drivers pre-registered; pools resolve against
//! it by default. Isolated instances from [`DriverRegistry::with_builtins`]
//! or [`DriverRegistry::empty`] exist for tests and embedders that want a
//! controlled driver set.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::client::RpcClient;
use crate::protocol::{BinaryCodec, JsonCodec};
use crate::transport::SharedStream;

// ============================================================================
// Protocol Names
// ============================================================================

/// Binary length-prefixed protocol; the default.
pub const GOB_PROTOCOL: &str = "gob";

/// Newline-delimited JSON protocol.
pub const JSON_PROTOCOL: &str = "json";

/// Protocol used when construction passes an empty protocol name.
pub const DEFAULT_PROTOCOL: &str = GOB_PROTOCOL;

// ============================================================================
// Driver
// ============================================================================

/// Constructor turning a pooled connection's stream into a client handle.
///
/// Drivers must be cheap and local: no network I/O beyond what handle
/// construction itself requires.
pub type Driver = Arc<dyn Fn(SharedStream) -> RpcClient + Send + Sync>;

// ============================================================================
// DriverRegistry
// ============================================================================

/// Table of protocol name → driver.
///
/// Safe for concurrent registration and lookup; see the module docs for
/// the first-writer-wins policy.
pub struct DriverRegistry {
    /// Registered drivers by protocol name.
    drivers: RwLock<FxHashMap<String, Driver>>,
}

impl DriverRegistry {
    /// Creates a registry with no drivers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            drivers: RwLock::new(FxHashMap::default()),
        }
    }

    /// Creates a registry with the built-in `gob` and `json` drivers.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        registry.register(GOB_PROTOCOL, Arc::new(gob_driver));
        registry.register(JSON_PROTOCOL, Arc::new(json_driver));
        registry
    }

    /// Returns the process-wide registry, initializing it on first use.
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<DriverRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::with_builtins)
    }

    /// Registers a driver for a protocol name.
    ///
    /// Inserts only if the name is absent; re-registration is a silent
    /// no-op and the original driver stays in place.
    pub fn register(&self, protocol: impl Into<String>, driver: Driver) {
        let protocol = protocol.into();
        let mut drivers = self.drivers.write();

        if drivers.contains_key(&protocol) {
            debug!(%protocol, "Driver already registered, keeping first");
            return;
        }

        debug!(%protocol, "Driver registered");
        drivers.insert(protocol, driver);
    }

    /// Looks up the driver for a protocol name.
    #[must_use]
    pub fn lookup(&self, protocol: &str) -> Option<Driver> {
        self.drivers.read().get(protocol).cloned()
    }

    /// Returns `true` if a driver is registered for `protocol`.
    #[inline]
    #[must_use]
    pub fn is_registered(&self, protocol: &str) -> bool {
        self.drivers.read().contains_key(protocol)
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.drivers.read().keys().cloned().collect();
        f.debug_struct("DriverRegistry")
            .field("protocols", &names)
            .finish()
    }
}

// ============================================================================
// Global Convenience
// ============================================================================

/// Registers a driver in the process-wide registry.
///
/// Call before constructing a pool that names this protocol. First
/// registration for a name wins; later calls are silent no-ops.
pub fn register(protocol: impl Into<String>, driver: Driver) {
    DriverRegistry::global().register(protocol, driver);
}

// ============================================================================
// Built-in Drivers
// ============================================================================

/// Built-in driver for the binary protocol.
fn gob_driver(stream: SharedStream) -> RpcClient {
    RpcClient::with_codec(stream, Box::new(BinaryCodec::new()))
}

/// Built-in driver for the JSON protocol.
fn json_driver(stream: SharedStream) -> RpcClient {
    RpcClient::with_codec(stream, Box::new(JsonCodec::new()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::BufStream;
    use tokio::sync::Mutex;

    use crate::transport::BoxedConn;

    /// A throwaway shared stream for invoking drivers directly.
    fn dummy_stream() -> SharedStream {
        let (local, _peer) = tokio::io::duplex(64);
        Arc::new(Mutex::new(BufStream::new(Box::new(local) as BoxedConn)))
    }

    /// A driver that counts its invocations.
    fn counting_driver(counter: Arc<AtomicUsize>) -> Driver {
        Arc::new(move |stream| {
            counter.fetch_add(1, Ordering::SeqCst);
            RpcClient::with_codec(stream, Box::new(JsonCodec::new()))
        })
    }

    #[test]
    fn test_builtins_registered() {
        let registry = DriverRegistry::with_builtins();
        assert!(registry.is_registered(GOB_PROTOCOL));
        assert!(registry.is_registered(JSON_PROTOCOL));
        assert!(registry.lookup(GOB_PROTOCOL).is_some());
    }

    #[test]
    fn test_empty_registry_has_no_drivers() {
        let registry = DriverRegistry::empty();
        assert!(!registry.is_registered(GOB_PROTOCOL));
        assert!(registry.lookup("anything").is_none());
    }

    #[test]
    fn test_global_has_builtins() {
        let registry = DriverRegistry::global();
        assert!(registry.is_registered(GOB_PROTOCOL));
        assert!(registry.is_registered(JSON_PROTOCOL));
    }

    #[test]
    fn test_lookup_unknown_protocol() {
        let registry = DriverRegistry::with_builtins();
        assert!(registry.lookup("xml").is_none());
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = DriverRegistry::empty();
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));

        registry.register("custom", counting_driver(Arc::clone(&first_calls)));
        registry.register("custom", counting_driver(Arc::clone(&second_calls)));

        let driver = registry.lookup("custom").expect("registered");
        let _client = driver(dummy_stream());

        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reregistering_builtin_is_ignored() {
        let registry = DriverRegistry::with_builtins();
        let calls = Arc::new(AtomicUsize::new(0));

        registry.register(GOB_PROTOCOL, counting_driver(Arc::clone(&calls)));

        let driver = registry.lookup(GOB_PROTOCOL).expect("registered");
        let _client = driver(dummy_stream());

        // The replacement driver was never installed.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrent_registration_single_winner() {
        let registry = Arc::new(DriverRegistry::empty());
        let invoked = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let invoked = Arc::clone(&invoked);
                std::thread::spawn(move || {
                    registry.register("raced", counting_driver(invoked));
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread");
        }

        // Exactly one driver ended up installed; invoking it counts once.
        let driver = registry.lookup("raced").expect("registered");
        let _client = driver(dummy_stream());
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
    }
}
