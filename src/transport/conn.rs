//! Transport connection wrapper and dial configuration.
//!
//! A pooled connection is a buffered bidirectional byte stream behind a
//! shared handle. The pool engine owns the [`PooledConn`] wrapper through
//! its idle/checked-out lifecycle; a driver receives a clone of the shared
//! stream when it manufactures a client handle, so the same transport
//! session survives any number of handle generations.
//!
//! # Connection Lifecycle
//!
//! 1. Factory dials a raw transport ([`BoxedConn`])
//! 2. `PooledConn::new` wraps it in a buffered shared stream
//! 3. Checkout hands a [`SharedStream`] clone to the protocol driver
//! 4. Release returns the wrapper to the idle queue, stream intact
//! 5. Discard shuts the stream down; the wrapper is consumed

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::ConnId;

// ============================================================================
// Constants
// ============================================================================

/// Dial target used when no factory and no address are configured.
const DEFAULT_DIAL_ADDR: &str = "127.0.0.1:4000";

/// Connect timeout used when none is configured.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Stream Types
// ============================================================================

/// Any bidirectional byte stream usable as a pooled transport.
///
/// Blanket-implemented; `TcpStream`, unix sockets, and in-memory duplex
/// pipes all qualify.
pub trait RawConn: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> RawConn for T {}

/// Owned, type-erased raw transport as produced by a [`ConnFactory`].
pub type BoxedConn = Box<dyn RawConn>;

/// Buffered stream over a boxed raw transport.
///
/// Codecs read and write through this type; buffering makes the JSON
/// codec's line reads and the binary codec's header reads cheap.
pub type ConnStream = BufStream<BoxedConn>;

/// Shared handle to a connection's stream.
///
/// Cloned into every client handle built on the connection. The async
/// mutex serializes whole calls, so a request/response exchange is never
/// interleaved with another writer.
pub type SharedStream = Arc<Mutex<ConnStream>>;

/// Factory producing new raw transport connections.
///
/// Invoked by the pool engine for the initial fill and whenever an acquire
/// finds no idle connection. Errors propagate unchanged to the acquirer.
pub type ConnFactory = Arc<dyn Fn() -> BoxFuture<'static, Result<BoxedConn>> + Send + Sync>;

// ============================================================================
// DialOptions
// ============================================================================

/// Configuration for the default TCP dial factory.
///
/// Used when a pool is constructed without an explicit factory. The
/// defaults mirror a local RPC server on `127.0.0.1:4000` with a 5 second
/// connect deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialOptions {
    /// Address to dial, in `host:port` form.
    pub addr: String,

    /// Maximum time to wait for the connect to complete.
    pub connect_timeout: Duration,
}

impl Default for DialOptions {
    fn default() -> Self {
        Self {
            addr: DEFAULT_DIAL_ADDR.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl DialOptions {
    /// Creates dial options for a specific address with the default
    /// connect timeout.
    #[inline]
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Builds a [`ConnFactory`] that dials this address over TCP.
    ///
    /// Each invocation performs one timeout-bounded connect.
    #[must_use]
    pub fn factory(&self) -> ConnFactory {
        let addr = self.addr.clone();
        let connect_timeout = self.connect_timeout;

        Arc::new(move || {
            let addr = addr.clone();
            Box::pin(async move {
                let stream = timeout(connect_timeout, TcpStream::connect(&addr))
                    .await
                    .map_err(|_| {
                        Error::connection_timeout(connect_timeout.as_millis() as u64)
                    })?
                    .map_err(|e| Error::connection(format!("dial {addr}: {e}")))?;

                trace!(%addr, "Dialed transport connection");
                Ok(Box::new(stream) as BoxedConn)
            })
        })
    }
}

// ============================================================================
// PooledConn
// ============================================================================

/// Pool-managed wrapper of one transport connection.
///
/// This is the value side of the handle binding table: returning it to the
/// engine re-pools the connection, consuming it via discard removes the
/// connection from circulation permanently.
pub(crate) struct PooledConn {
    /// Connection identity, for log correlation.
    id: ConnId,

    /// The buffered stream, shared with client handles built on it.
    stream: SharedStream,
}

impl PooledConn {
    /// Wraps a freshly dialed raw transport.
    pub(crate) fn new(raw: BoxedConn) -> Self {
        let id = ConnId::next();
        debug!(conn_id = %id, "Transport connection pooled");

        Self {
            id,
            stream: Arc::new(Mutex::new(BufStream::new(raw))),
        }
    }

    /// Returns the connection ID.
    #[inline]
    pub(crate) fn id(&self) -> ConnId {
        self.id
    }

    /// Returns a shared handle to the stream for driver construction.
    #[inline]
    pub(crate) fn stream(&self) -> SharedStream {
        Arc::clone(&self.stream)
    }

    /// Shuts the stream down, flushing buffered output first.
    ///
    /// Errors are ignored; the connection is being thrown away.
    pub(crate) async fn shutdown(&self) {
        let mut io = self.stream.lock().await;
        let _ = io.shutdown().await;
        debug!(conn_id = %self.id, "Transport connection shut down");
    }
}

impl fmt::Debug for PooledConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConn").field("id", &self.id).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::AsyncReadExt;

    #[test]
    fn test_dial_options_defaults() {
        let options = DialOptions::default();
        assert_eq!(options.addr, "127.0.0.1:4000");
        assert_eq!(options.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_dial_options_custom() {
        let options =
            DialOptions::new("10.0.0.1:9000").with_connect_timeout(Duration::from_millis(250));
        assert_eq!(options.addr, "10.0.0.1:9000");
        assert_eq!(options.connect_timeout, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_default_factory_reports_dial_failure() {
        // Port 1 on localhost is not listening; connect fails fast.
        let factory = DialOptions::new("127.0.0.1:1").factory();
        let result = factory().await;

        let err = result.err().expect("dial should fail");
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_pooled_conn_shutdown_closes_peer() {
        let (local, mut peer) = tokio::io::duplex(64);
        let conn = PooledConn::new(Box::new(local));

        conn.shutdown().await;

        let mut buf = [0u8; 8];
        let n = peer.read(&mut buf).await.expect("read");
        assert_eq!(n, 0, "peer should observe EOF after shutdown");
    }

    #[tokio::test]
    async fn test_stream_handle_is_shared() {
        let (local, _peer) = tokio::io::duplex(64);
        let conn = PooledConn::new(Box::new(local));

        let a = conn.stream();
        let b = conn.stream();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_conn_ids_distinct_per_connection() {
        let (one, _p1) = tokio::io::duplex(8);
        let (two, _p2) = tokio::io::duplex(8);

        let first = PooledConn::new(Box::new(one));
        let second = PooledConn::new(Box::new(two));
        assert_ne!(first.id(), second.id());
    }
}
