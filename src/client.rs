//! RPC client handle.
//!
//! [`RpcClient`] is the object callers receive from the pool facade. It
//! carries no visible reference back to the pooled connection it was built
//! from; the facade recovers the connection through the handle's
//! [`ClientId`] and the binding table.
//!
//! # Call Model
//!
//! One request/response exchange at a time per handle: the stream lock is
//! held for the whole exchange, so concurrent `call`s on one handle
//! serialize. Different handles never contend (each wraps its own
//! connection).
//!
//! # After an Error
//!
//! A handle whose call failed with a connection-level error (see
//! [`Error::is_connection_error`]) should go back to the pool via
//! `close_rpc_conn`, not `release`; the stream may hold a half-finished
//! exchange.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::ClientId;
use crate::protocol::{CallRequest, ClientCodec};
use crate::transport::SharedStream;

// ============================================================================
// RpcClient
// ============================================================================

/// Caller-facing RPC client handle over one pooled connection.
///
/// Manufactured by a protocol driver during `get`. The handle stays valid
/// until the caller returns it with `release` or `close_rpc_conn`; using
/// it after that point exchanges data on a connection that may already
/// belong to another borrower.
pub struct RpcClient {
    /// Handle identity; the binding-table key.
    id: ClientId,

    /// Shared stream of the underlying pooled connection.
    stream: SharedStream,

    /// Wire codec, exclusive to this handle.
    codec: Mutex<Box<dyn ClientCodec>>,

    /// Sequence counter for request/response correlation.
    seq: AtomicU64,
}

impl RpcClient {
    /// Creates a handle speaking `codec` over `stream`.
    ///
    /// This is the constructor drivers call; application code obtains
    /// handles from the pool facade instead.
    #[must_use]
    pub fn with_codec(stream: SharedStream, codec: Box<dyn ClientCodec>) -> Self {
        Self {
            id: ClientId::next(),
            stream,
            codec: Mutex::new(codec),
            seq: AtomicU64::new(1),
        }
    }

    /// Returns the handle's identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Calls a remote method and waits for its reply.
    ///
    /// `method` identifies a registered handler on the remote end in
    /// `Service.Method` form; `request` is the single request value.
    ///
    /// # Errors
    ///
    /// - [`Error::Rpc`] if the remote handler reported an error
    /// - [`Error::ConnectionClosed`] if the connection dropped mid-call
    /// - [`Error::Protocol`] if the reply does not correlate with the
    ///   request
    /// - [`Error::Json`] / [`Error::Codec`] on payload encode/decode
    ///   failures
    pub async fn call<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let params = serde_json::to_value(request)?;
        let result = self.call_value(method, params).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Calls a remote method with a deadline.
    ///
    /// On timeout the exchange may be half-finished and the connection
    /// should be discarded via `close_rpc_conn`.
    ///
    /// # Errors
    ///
    /// [`Error::RequestTimeout`] once the deadline passes; otherwise as
    /// [`RpcClient::call`].
    pub async fn call_with_timeout<Req, Resp>(
        &self,
        method: &str,
        request: &Req,
        call_timeout: Duration,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let params = serde_json::to_value(request)?;

        match timeout(call_timeout, self.call_value(method, params)).await {
            Ok(result) => Ok(serde_json::from_value(result?)?),
            Err(_) => Err(Error::request_timeout(
                method,
                call_timeout.as_millis() as u64,
            )),
        }
    }

    /// Performs one request/response exchange with untyped values.
    async fn call_value(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.seq.fetch_add(1, Ordering::Relaxed);
        let request = CallRequest::new(id, method, params);

        let mut codec = self.codec.lock().await;
        let mut io = self.stream.lock().await;

        codec.write_request(&mut io, &request).await?;
        let response = codec.read_response(&mut io).await?;

        drop(io);
        drop(codec);

        trace!(client_id = %self.id, method, seq = id, "Call completed");

        if response.id != id {
            return Err(Error::protocol(format!(
                "response id {} does not match request id {id}",
                response.id
            )));
        }

        response.into_result(method)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient").field("id", &self.id).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
