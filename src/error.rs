//! Error types for the RPC connection pool.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use rpc_pool::{Result, RpcConnPool};
//!
//! async fn example(pool: &RpcConnPool) -> Result<String> {
//!     let client = pool.get().await?;
//!     let reply = client.call("HelloWorld.Hello", &()).await?;
//!     pool.release(&client).await;
//!     Ok(reply)
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::UnsupportedProtocol`] |
//! | Acquisition | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::PoolClosed`] |
//! | Call | [`Error::ConnectionClosed`], [`Error::Protocol`], [`Error::FrameTooLarge`], [`Error::Rpc`], [`Error::RequestTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Codec`] |
//!
//! Unknown handles passed to `release`/`close_rpc_conn` are not errors;
//! those operations are silent no-ops so callers can invoke them
//! defensively after a failed call.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging. Errors from the
/// pool engine and the codecs propagate unchanged; the crate adds no retry
/// or suppression of its own.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when pool construction parameters are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// No driver registered for the requested protocol name.
    #[error("Unsupported protocol: {protocol}")]
    UnsupportedProtocol {
        /// The protocol name that failed to resolve.
        protocol: String,
    },

    // ========================================================================
    // Acquisition Errors
    // ========================================================================
    /// Transport connection could not be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connect attempt exceeded its deadline.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The pool has been closed.
    ///
    /// Returned by `get` after `close`, and to acquirers that were blocked
    /// when `close` ran.
    #[error("Pool closed")]
    PoolClosed,

    // ========================================================================
    // Call Errors
    // ========================================================================
    /// Transport connection closed while a call was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Protocol violation or unexpected response.
    ///
    /// Returned when a frame cannot be interpreted or a response does not
    /// correlate with the request that was sent.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Frame exceeds the maximum allowed size.
    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Size of the offending frame.
        size: usize,
        /// Maximum allowed frame size.
        max: usize,
    },

    /// The remote handler returned an error.
    #[error("RPC error calling {method}: {message}")]
    Rpc {
        /// Method name that was called.
        method: String,
        /// Error message reported by the remote end.
        message: String,
    },

    /// A call did not complete within its timeout.
    #[error("Call to {method} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Method name that was called.
        method: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary payload encode/decode error.
    #[error("Codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an unsupported protocol error.
    #[inline]
    pub fn unsupported_protocol(protocol: impl Into<String>) -> Self {
        Self::UnsupportedProtocol {
            protocol: protocol.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a frame-too-large error.
    #[inline]
    pub fn frame_too_large(size: usize, max: usize) -> Self {
        Self::FrameTooLarge { size, max }
    }

    /// Creates a remote RPC error.
    #[inline]
    pub fn rpc(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            method: method.into(),
            timeout_ms,
        }
    }

    /// Creates a codec error.
    #[inline]
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection-level error.
    ///
    /// A `true` result on a call error means the underlying connection
    /// should not be trusted; pass the handle to `close_rpc_conn` rather
    /// than `release`.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::Io(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry with a fresh connection.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. }
                | Self::RequestTimeout { .. }
                | Self::ConnectionClosed
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
