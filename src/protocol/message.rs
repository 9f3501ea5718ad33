//! Call request and response message types.
//!
//! Defines the message format exchanged between a client handle and the
//! remote RPC server. The same two types are carried by every codec; only
//! the framing and payload encoding differ per protocol.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// CallRequest
// ============================================================================

/// A single outgoing call.
///
/// # Format (JSON codec)
///
/// ```json
/// {
///   "id": 7,
///   "method": "HelloWorld.Hello",
///   "params": { ... }
/// }
/// ```
///
/// The binary codec carries the same fields in a length-prefixed CBOR
/// frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRequest {
    /// Sequence number for request/response correlation.
    pub id: u64,

    /// Method name in `Service.Method` form; identifies the registered
    /// handler on the remote end.
    pub method: String,

    /// Single request value.
    pub params: Value,
}

impl CallRequest {
    /// Creates a new call request.
    #[inline]
    #[must_use]
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

// ============================================================================
// CallResponse
// ============================================================================

/// A single incoming reply.
///
/// # Format (JSON codec)
///
/// Success:
/// ```json
/// { "id": 7, "result": { ... }, "error": null }
/// ```
///
/// Error:
/// ```json
/// { "id": 7, "result": null, "error": "no such method" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResponse {
    /// Matches the request `id`.
    pub id: u64,

    /// Result value (if the handler succeeded).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error message (if the handler failed).
    #[serde(default)]
    pub error: Option<String>,
}

impl CallResponse {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    #[inline]
    #[must_use]
    pub fn failure(id: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Returns `true` if the remote handler reported an error.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, mapping a remote error to [`Error::Rpc`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rpc`] if the response carries an error message.
    pub fn into_result(self, method: &str) -> Result<Value> {
        match self.error {
            Some(message) => Err(Error::rpc(method, message)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = CallRequest::new(3, "HelloWorld.Hello", json!({"name": "world"}));
        let text = serde_json::to_string(&request).expect("serialize");

        assert!(text.contains("\"id\":3"));
        assert!(text.contains("HelloWorld.Hello"));
        assert!(text.contains("\"name\":\"world\""));
    }

    #[test]
    fn test_response_success_roundtrip() {
        let text = r#"{"id":3,"result":"HelloWorld","error":null}"#;
        let response: CallResponse = serde_json::from_str(text).expect("parse");

        assert!(!response.is_error());
        let value = response.into_result("HelloWorld.Hello").expect("result");
        assert_eq!(value, json!("HelloWorld"));
    }

    #[test]
    fn test_response_missing_fields_default() {
        let text = r#"{"id":9}"#;
        let response: CallResponse = serde_json::from_str(text).expect("parse");

        assert_eq!(response.id, 9);
        assert!(response.result.is_none());
        assert!(!response.is_error());
        assert_eq!(
            response.into_result("Echo.Echo").expect("result"),
            Value::Null
        );
    }

    #[test]
    fn test_response_error_maps_to_rpc_error() {
        let response = CallResponse::failure(4, "no such method");
        assert!(response.is_error());

        let err = response.into_result("Missing.Method").unwrap_err();
        assert!(matches!(err, Error::Rpc { .. }));
        assert!(err.to_string().contains("no such method"));
    }
}
