//! RPC connection pool - reusable transport connections behind opaque
//! client handles.
//!
//! This library keeps a bounded pool of transport connections and hands
//! them out wrapped in RPC client handles, so callers issue calls without
//! paying a transport session per call.
//!
//! # Architecture
//!
//! A handle gives no way back to the connection it was built from, so the
//! pool keeps a binding table from handle identity to pooled connection:
//!
//! - **Driver registry**: protocol name → handle constructor; `gob`
//!   (binary, default) and `json` built in, custom drivers registerable
//! - **Pool engine**: factory-driven creation, idle storage, capacity
//!   bounding
//! - **Binding table**: recovers the connection when a handle comes back
//! - **Facade**: [`RpcConnPool`] composing the three
//!
//! # Quick Start
//!
//! ```no_run
//! use rpc_pool::{Result, RpcConnPool};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Pool of up to 16 binary-protocol connections to a local server
//!     let pool = RpcConnPool::builder()
//!         .capacity(4, 16)
//!         .dial_addr("127.0.0.1:4000")
//!         .build()
//!         .await?;
//!
//!     let client = pool.get().await?;
//!     let reply: String = client.call("HelloWorld.Hello", &()).await?;
//!     println!("reply: {reply}");
//!
//!     // Re-pool the connection; use close_rpc_conn after call failures
//!     pool.release(&client).await;
//!     pool.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`RpcClient`] handle issued by the pool |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`pool`] | [`RpcConnPool`] facade and builder |
//! | [`protocol`] | Wire messages and client codecs |
//! | [`registry`] | Protocol driver registry |
//! | [`transport`] | Connection wrapper, dial options, pool engine |

// ============================================================================
// Modules
// ============================================================================

/// Handle-to-connection binding table (internal).
mod bindings;

/// RPC client handle.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for pool entities.
pub mod identifiers;

/// Connection pool facade.
pub mod pool;

/// Wire protocol message types and codecs.
pub mod protocol;

/// Protocol driver registry.
pub mod registry;

/// Transport layer: pooled connections and the pool engine.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Facade types
pub use pool::{RpcConnPool, RpcConnPoolBuilder};

// Client handle
pub use client::RpcClient;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ClientId, ConnId};

// Registry types
pub use registry::{
    DEFAULT_PROTOCOL, Driver, DriverRegistry, GOB_PROTOCOL, JSON_PROTOCOL, register,
};

// Protocol types
pub use protocol::{BinaryCodec, CallRequest, CallResponse, ClientCodec, JsonCodec};

// Transport types
pub use transport::{BoxedConn, ConnFactory, ConnStream, DialOptions, RawConn, SharedStream};
