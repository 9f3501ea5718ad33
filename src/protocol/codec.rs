//! Client-side wire codecs.
//!
//! A codec turns [`CallRequest`]/[`CallResponse`] values into bytes on a
//! pooled connection's stream and back. Two codecs ship with the crate:
//!
//! - [`BinaryCodec`] — length-prefixed frames with CBOR payloads; the
//!   default protocol, registered under the `gob` name
//! - [`JsonCodec`] — newline-delimited JSON objects, registered under the
//!   `json` name
//!
//! Custom codecs implement [`ClientCodec`] and are wired in through a
//! registered driver; the pool itself never inspects the wire format.

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::transport::ConnStream;

use super::message::{CallRequest, CallResponse};

// ============================================================================
// Constants
// ============================================================================

/// Maximum frame size accepted by the built-in codecs (10MB).
pub const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Binary frame header size: 4 byte big-endian payload length.
const FRAME_HEADER_SIZE: usize = 4;

// ============================================================================
// ClientCodec
// ============================================================================

/// Encodes requests onto and decodes responses from a connection stream.
///
/// A codec instance belongs to exactly one client handle; the handle
/// serializes calls, so implementations never see interleaved exchanges.
/// State kept between `write_request` and `read_response` is therefore
/// safe.
#[async_trait]
pub trait ClientCodec: Send {
    /// Writes one request, including any framing, and flushes the stream.
    async fn write_request(&mut self, io: &mut ConnStream, request: &CallRequest) -> Result<()>;

    /// Reads one complete response frame.
    ///
    /// A clean EOF before any frame byte maps to [`Error::ConnectionClosed`].
    async fn read_response(&mut self, io: &mut ConnStream) -> Result<CallResponse>;
}

// ============================================================================
// BinaryCodec
// ============================================================================

/// Length-prefixed binary codec with CBOR payloads.
///
/// Wire format per message: `u32` big-endian payload length, then the CBOR
/// encoding of the request or response struct.
#[derive(Debug, Clone)]
pub struct BinaryCodec {
    /// Frames larger than this are rejected on both sides.
    max_frame_size: usize,
}

impl BinaryCodec {
    /// Creates a binary codec with the default frame limit.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Creates a codec with a custom maximum frame size.
    #[inline]
    #[must_use]
    pub const fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}

impl Default for BinaryCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClientCodec for BinaryCodec {
    async fn write_request(&mut self, io: &mut ConnStream, request: &CallRequest) -> Result<()> {
        let mut payload = Vec::new();
        ciborium::ser::into_writer(request, &mut payload)
            .map_err(|e| Error::codec(e.to_string()))?;

        if payload.len() > self.max_frame_size {
            return Err(Error::frame_too_large(payload.len(), self.max_frame_size));
        }

        let mut frame = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
        #[allow(clippy::cast_possible_truncation)]
        frame.put_u32(payload.len() as u32);
        frame.put_slice(&payload);

        io.write_all(&frame).await?;
        io.flush().await?;
        Ok(())
    }

    async fn read_response(&mut self, io: &mut ConnStream) -> Result<CallResponse> {
        let payload_len = io.read_u32().await.map_err(map_read_error)? as usize;

        if payload_len > self.max_frame_size {
            return Err(Error::frame_too_large(payload_len, self.max_frame_size));
        }

        let mut payload = vec![0u8; payload_len];
        io.read_exact(&mut payload).await.map_err(map_read_error)?;

        ciborium::de::from_reader(payload.as_slice()).map_err(|e| Error::codec(e.to_string()))
    }
}

// ============================================================================
// JsonCodec
// ============================================================================

/// Newline-delimited JSON codec.
///
/// Wire format per message: one JSON object followed by `\n`.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    /// Serialized requests larger than this are rejected before sending.
    max_frame_size: usize,
}

impl JsonCodec {
    /// Creates a JSON codec with the default frame limit.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Creates a codec with a custom maximum frame size.
    #[inline]
    #[must_use]
    pub const fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClientCodec for JsonCodec {
    async fn write_request(&mut self, io: &mut ConnStream, request: &CallRequest) -> Result<()> {
        let mut line = serde_json::to_vec(request)?;

        if line.len() > self.max_frame_size {
            return Err(Error::frame_too_large(line.len(), self.max_frame_size));
        }
        line.push(b'\n');

        io.write_all(&line).await?;
        io.flush().await?;
        Ok(())
    }

    async fn read_response(&mut self, io: &mut ConnStream) -> Result<CallResponse> {
        let mut line = String::new();
        let n = io.read_line(&mut line).await.map_err(map_read_error)?;

        if n == 0 {
            return Err(Error::ConnectionClosed);
        }

        Ok(serde_json::from_str(&line)?)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Maps a read failure to the crate error, folding EOF into
/// [`Error::ConnectionClosed`].
fn map_read_error(e: std::io::Error) -> Error {
    if e.kind() == ErrorKind::UnexpectedEof {
        Error::ConnectionClosed
    } else {
        Error::Io(e)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::io::BufStream;

    use crate::transport::BoxedConn;

    /// Builds two connected [`ConnStream`] ends over an in-memory pipe.
    fn stream_pair() -> (ConnStream, ConnStream) {
        let (a, b) = tokio::io::duplex(64 * 1024);
        (
            BufStream::new(Box::new(a) as BoxedConn),
            BufStream::new(Box::new(b) as BoxedConn),
        )
    }

    #[tokio::test]
    async fn test_binary_request_decodes_on_peer() {
        let (mut client, mut server) = stream_pair();
        let mut codec = BinaryCodec::new();

        let request = CallRequest::new(1, "Echo.Echo", json!({"value": 42}));
        codec.write_request(&mut client, &request).await.expect("write");

        let len = server.read_u32().await.expect("len") as usize;
        let mut payload = vec![0u8; len];
        server.read_exact(&mut payload).await.expect("payload");

        let decoded: CallRequest =
            ciborium::de::from_reader(payload.as_slice()).expect("decode");
        assert_eq!(decoded.id, 1);
        assert_eq!(decoded.method, "Echo.Echo");
        assert_eq!(decoded.params, json!({"value": 42}));
    }

    #[tokio::test]
    async fn test_binary_response_roundtrip() {
        let (mut client, mut server) = stream_pair();
        let mut codec = BinaryCodec::new();

        let response = CallResponse::success(7, json!("HelloWorld"));
        let mut payload = Vec::new();
        ciborium::ser::into_writer(&response, &mut payload).expect("encode");

        use tokio::io::AsyncWriteExt;
        #[allow(clippy::cast_possible_truncation)]
        server.write_u32(payload.len() as u32).await.expect("len");
        server.write_all(&payload).await.expect("payload");
        server.flush().await.expect("flush");

        let decoded = codec.read_response(&mut client).await.expect("read");
        assert_eq!(decoded.id, 7);
        assert_eq!(decoded.result, Some(json!("HelloWorld")));
    }

    #[tokio::test]
    async fn test_binary_rejects_oversized_request() {
        let (mut client, _server) = stream_pair();
        let mut codec = BinaryCodec::new().with_max_frame_size(16);

        let request = CallRequest::new(1, "Echo.Echo", json!("a".repeat(64)));
        let err = codec.write_request(&mut client, &request).await.unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_binary_rejects_oversized_response_header() {
        let (mut client, mut server) = stream_pair();
        let mut codec = BinaryCodec::new().with_max_frame_size(16);

        use tokio::io::AsyncWriteExt;
        server.write_u32(1024).await.expect("len");
        server.flush().await.expect("flush");

        let err = codec.read_response(&mut client).await.unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge { size: 1024, .. }));
    }

    #[tokio::test]
    async fn test_binary_eof_maps_to_connection_closed() {
        let (mut client, server) = stream_pair();
        let mut codec = BinaryCodec::new();

        drop(server);

        let err = codec.read_response(&mut client).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_json_request_is_one_line() {
        let (mut client, mut server) = stream_pair();
        let mut codec = JsonCodec::new();

        let request = CallRequest::new(3, "HelloWorld.Hello", json!(null));
        codec.write_request(&mut client, &request).await.expect("write");

        let mut line = String::new();
        server.read_line(&mut line).await.expect("line");
        assert!(line.ends_with('\n'));

        let decoded: CallRequest = serde_json::from_str(&line).expect("decode");
        assert_eq!(decoded.id, 3);
        assert_eq!(decoded.method, "HelloWorld.Hello");
    }

    #[tokio::test]
    async fn test_json_response_roundtrip() {
        let (mut client, mut server) = stream_pair();
        let mut codec = JsonCodec::new();

        use tokio::io::AsyncWriteExt;
        server
            .write_all(b"{\"id\":3,\"result\":\"HelloWorld\",\"error\":null}\n")
            .await
            .expect("write");
        server.flush().await.expect("flush");

        let decoded = codec.read_response(&mut client).await.expect("read");
        assert_eq!(decoded.id, 3);
        assert_eq!(decoded.result, Some(json!("HelloWorld")));
        assert!(!decoded.is_error());
    }

    #[tokio::test]
    async fn test_json_eof_maps_to_connection_closed() {
        let (mut client, server) = stream_pair();
        let mut codec = JsonCodec::new();

        drop(server);

        let err = codec.read_response(&mut client).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_json_malformed_line_is_json_error() {
        let (mut client, mut server) = stream_pair();
        let mut codec = JsonCodec::new();

        use tokio::io::AsyncWriteExt;
        server.write_all(b"not json\n").await.expect("write");
        server.flush().await.expect("flush");

        let err = codec.read_response(&mut client).await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
