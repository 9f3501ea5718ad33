//! Wire protocol layer.
//!
//! Message types shared by every protocol, and the client codecs that put
//! them on the wire. The pool core never touches this module beyond
//! handing a connection stream to a driver; everything about framing and
//! payload encoding lives here.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | [`CallRequest`] / [`CallResponse`] types |
//! | `codec` | [`ClientCodec`] trait and the built-in codecs |

// ============================================================================
// Submodules
// ============================================================================

/// Call request and response message types.
pub mod message;

/// Client-side wire codecs.
pub mod codec;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{BinaryCodec, ClientCodec, JsonCodec, MAX_FRAME_SIZE};
pub use message::{CallRequest, CallResponse};
