//! Connection pool facade.
//!
//! [`RpcConnPool`] is the public entry point: it composes the driver
//! registry (consulted once, at construction), the transport pool engine
//! (connection lifecycle), and the handle binding table (translating
//! handle-level operations into connection-level ones).
//!
//! # Example
//!
//! ```no_run
//! use rpc_pool::{Result, RpcConnPool};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let pool = RpcConnPool::builder()
//!         .protocol("json")
//!         .capacity(4, 16)
//!         .dial_addr("127.0.0.1:6667")
//!         .build()
//!         .await?;
//!
//!     let client = pool.get().await?;
//!     let reply: String = client.call("HelloWorld.Hello", &()).await?;
//!     println!("reply: {reply}");
//!
//!     pool.release(&client).await;
//!     pool.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Returning Handles
//!
//! `release` re-pools the connection for reuse; `close_rpc_conn` removes
//! it from circulation. After a call failed with a connection-level error
//! the connection cannot be trusted mid-stream, so discard it:
//!
//! ```ignore
//! match client.call::<_, String>("Svc.Method", &req).await {
//!     Ok(reply) => pool.release(&client).await,
//!     Err(e) if e.is_connection_error() => pool.close_rpc_conn(&client).await,
//!     Err(e) => { pool.release(&client).await; return Err(e); }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::bindings::BindingTable;
use crate::client::RpcClient;
use crate::error::{Error, Result};
use crate::registry::{DEFAULT_PROTOCOL, Driver, DriverRegistry};
use crate::transport::{BoxedConn, ConnFactory, ConnPool, DialOptions};

// ============================================================================
// RpcConnPool
// ============================================================================

/// Pool of transport connections handed out as RPC client handles.
///
/// All operations take `&self` and are safe to call concurrently from
/// many tasks. The wire protocol is fixed at construction; the same pool
/// never mixes drivers.
///
/// Connections checked out at `close` time are caller-owned: they are not
/// forcibly reclaimed, and are shut down when their holder returns them.
pub struct RpcConnPool {
    /// Transport pool engine.
    pool: ConnPool,

    /// Driver resolved at construction; fixed for the facade's lifetime.
    driver: Driver,

    /// Handle → connection bindings for checked-out connections.
    bindings: BindingTable,

    /// Set once by `close`; makes later `get` calls fail fast.
    closed: AtomicBool,
}

impl RpcConnPool {
    /// Returns a builder for configuring a pool.
    #[inline]
    #[must_use]
    pub fn builder() -> RpcConnPoolBuilder {
        RpcConnPoolBuilder::new()
    }

    /// Creates a pool in one call.
    ///
    /// An empty `protocol` selects the default (`gob`); `factory` of
    /// `None` selects the default TCP dial factory (see [`DialOptions`]).
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedProtocol`] if no driver is registered for
    ///   `protocol`
    /// - [`Error::Config`] if the capacity bounds are invalid
    /// - any factory error from dialing the initial connections
    pub async fn new(
        protocol: &str,
        initial_cap: usize,
        max_cap: usize,
        factory: Option<ConnFactory>,
    ) -> Result<Self> {
        let mut builder = Self::builder()
            .protocol(protocol)
            .capacity(initial_cap, max_cap);
        if let Some(factory) = factory {
            builder = builder.factory_arc(factory);
        }
        builder.build().await
    }

    /// Borrows a ready-to-use client handle from the pool.
    ///
    /// May wait for capacity or for the factory to dial a new connection.
    /// The returned handle is bound to its connection before this method
    /// returns; pass it back with [`RpcConnPool::release`] or
    /// [`RpcConnPool::close_rpc_conn`] when done.
    ///
    /// # Errors
    ///
    /// - [`Error::PoolClosed`] after [`RpcConnPool::close`]
    /// - any acquisition error (factory failure, dial timeout)
    pub async fn get(&self) -> Result<RpcClient> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::PoolClosed);
        }

        let conn = self.pool.acquire().await?;
        let client = (self.driver)(conn.stream());

        debug!(client_id = %client.id(), conn_id = %conn.id(), "Handle issued");
        self.bindings.bind(client.id(), conn);

        Ok(client)
    }

    /// Returns the handle's connection to the pool as reusable.
    ///
    /// The connection stays open and becomes available to a future `get`.
    /// Unknown or already-returned handles are a silent no-op, so callers
    /// may release defensively.
    pub async fn release(&self, client: &RpcClient) {
        if let Some(conn) = self.bindings.take(client.id()) {
            self.pool.put(conn).await;
        }
    }

    /// Discards the handle's connection: it is shut down and never pooled
    /// again.
    ///
    /// Use instead of [`RpcConnPool::release`] after a protocol-level
    /// failure on the handle; the pool shrinks by one until a future
    /// `get` dials a replacement. Unknown handles are a silent no-op.
    pub async fn close_rpc_conn(&self, client: &RpcClient) {
        if let Some(conn) = self.bindings.take(client.id()) {
            self.pool.discard(conn).await;
        }
    }

    /// Closes the pool: shuts down all idle connections and fails blocked
    /// and future `get` calls with [`Error::PoolClosed`]. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("RPC connection pool closing");
        self.pool.close().await;
    }

    /// Returns the current reusable (idle) connection count.
    ///
    /// Checked-out connections are not counted.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Returns `true` if no idle connection is currently pooled.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once the pool has been closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for RpcConnPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcConnPool")
            .field("idle", &self.len())
            .field("bound", &self.bindings.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// RpcConnPoolBuilder
// ============================================================================

/// Builder for configuring an [`RpcConnPool`].
///
/// Use [`RpcConnPool::builder()`] to create a new builder. Capacity is
/// required; everything else has defaults (`gob` protocol, TCP dial
/// factory from [`DialOptions`]).
#[derive(Clone)]
pub struct RpcConnPoolBuilder {
    /// Protocol name; empty selects the default.
    protocol: String,

    /// Connections dialed eagerly at construction.
    initial_cap: usize,

    /// Upper bound on live connections.
    max_cap: usize,

    /// Explicit connection factory, if any.
    factory: Option<ConnFactory>,

    /// Dial configuration for the default factory.
    dial: DialOptions,
}

impl Default for RpcConnPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcConnPoolBuilder {
    /// Creates a builder with no capacity configured.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            protocol: String::new(),
            initial_cap: 0,
            max_cap: 0,
            factory: None,
            dial: DialOptions::default(),
        }
    }

    /// Sets the wire protocol by registered name.
    ///
    /// An empty name keeps the default (`gob`).
    #[inline]
    #[must_use]
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Sets the capacity bounds: `initial_cap` connections dialed at
    /// construction, at most `max_cap` live at any time.
    #[inline]
    #[must_use]
    pub fn capacity(mut self, initial_cap: usize, max_cap: usize) -> Self {
        self.initial_cap = initial_cap;
        self.max_cap = max_cap;
        self
    }

    /// Sets the connection factory from an async closure.
    #[must_use]
    pub fn factory<F, Fut>(self, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<BoxedConn>> + Send + 'static,
    {
        self.factory_arc(std::sync::Arc::new(move || Box::pin(factory())))
    }

    /// Sets the connection factory from an existing [`ConnFactory`].
    #[inline]
    #[must_use]
    pub fn factory_arc(mut self, factory: ConnFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Sets the address the default factory dials.
    ///
    /// Ignored when an explicit factory is configured.
    #[inline]
    #[must_use]
    pub fn dial_addr(mut self, addr: impl Into<String>) -> Self {
        self.dial.addr = addr.into();
        self
    }

    /// Sets the connect timeout of the default factory.
    ///
    /// Ignored when an explicit factory is configured.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.dial.connect_timeout = connect_timeout;
        self
    }

    /// Replaces the whole dial configuration of the default factory.
    #[inline]
    #[must_use]
    pub fn dial_options(mut self, dial: DialOptions) -> Self {
        self.dial = dial;
        self
    }

    /// Builds the pool against the process-wide driver registry.
    ///
    /// # Errors
    ///
    /// See [`RpcConnPool::new`].
    pub async fn build(self) -> Result<RpcConnPool> {
        self.build_with(DriverRegistry::global()).await
    }

    /// Builds the pool against an explicit driver registry.
    ///
    /// The registry is consulted once; the resolved driver is fixed for
    /// the pool's lifetime.
    ///
    /// # Errors
    ///
    /// See [`RpcConnPool::new`].
    pub async fn build_with(self, registry: &DriverRegistry) -> Result<RpcConnPool> {
        let Self {
            protocol,
            initial_cap,
            max_cap,
            factory,
            dial,
        } = self;

        let protocol = if protocol.is_empty() {
            DEFAULT_PROTOCOL
        } else {
            protocol.as_str()
        };
        let driver = registry
            .lookup(protocol)
            .ok_or_else(|| Error::unsupported_protocol(protocol))?;

        let factory = factory.unwrap_or_else(|| dial.factory());
        let pool = ConnPool::new(initial_cap, max_cap, factory).await?;

        info!(%protocol, initial_cap, max_cap, "RPC connection pool created");

        Ok(RpcConnPool {
            pool,
            driver,
            bindings: BindingTable::new(),
            closed: AtomicBool::new(false),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
