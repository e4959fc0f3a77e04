//! Wire protocol shared by both chat endpoints.
//!
//! # Peer frames
//!
//! Every frame on a peer link is one JSON object tagged by `type`:
//!
//! ```text
//! { "type": "handshake", "user": { "id", "name", "nativeLang" } }
//! { "type": "message",   "message": { "id", "senderId", ... } }
//! ```
//!
//! Each side sends exactly one handshake right after the channel opens,
//! before any message frame.
//!
//! On byte-stream transports frames are length-prefixed:
//! - 4 bytes: payload length (u32, big-endian)
//! - N bytes: JSON payload
//!
//! # Translation endpoint
//!
//! [`TranslateRequest`], [`TranslateResponse`], [`ErrorBody`] and
//! [`HealthResponse`] describe the JSON bodies of `POST /translate` and
//! `GET /translate`.
//!
//! # Example
//!
//! ```rust
//! use parley_core::PeerIdentity;
//! use parley_protocol::{Frame, decode_frame, encode_frame};
//!
//! let frame = Frame::handshake(PeerIdentity::new("peer-1", "Ana", "es"));
//! let bytes = encode_frame(&frame).unwrap();
//! let decoded = decode_frame(&bytes).unwrap();
//! assert_eq!(decoded, frame);
//! ```

mod error;
mod frame;
mod framing;
mod translate;

pub use error::{ProtocolError, ProtocolResult};
pub use frame::Frame;
pub use framing::{decode_frame, encode_frame, read_frame_async, write_frame_async};
pub use translate::{BackendHealth, ErrorBody, HealthResponse, TranslateRequest, TranslateResponse};

/// Maximum encoded frame size (1 MB).
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;
