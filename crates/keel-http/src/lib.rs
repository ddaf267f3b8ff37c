//! Incremental HTTP/1.1 wire codec.
//!
//! This crate provides the streaming parser and encoder core used on both
//! the client and server sides of an HTTP/1.1 connection:
//!
//! - Restartable byte-at-a-time decoders for field lines, start lines and
//!   chunked bodies — every decoder can stop at any byte boundary and
//!   resume on the next buffer.
//! - Per-connection message receivers ([`RequestReceiver`],
//!   [`ResponseReceiver`]) that sequence start line → headers → body and
//!   report structural events as [`Rx`] signals.
//! - Outgoing message builders ([`TxRequest`], [`TxResponse`]) with
//!   response-splitting protection and chunked emission.
//!
//! The transport is the host's concern: the codec only ever consumes and
//! produces byte slices, never blocks and never allocates beyond the
//! configured [`ParseLimits`].
//!
//! # Example
//!
//! ```
//! use keel_http::{RequestReceiver, Rx};
//!
//! let mut receiver = RequestReceiver::new();
//! let (rx, consumed) = receiver.receive(b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n");
//! assert_eq!(rx, Rx::Valid);
//! assert_eq!(consumed, 32);
//! assert_eq!(receiver.request().uri(), "/hello");
//! ```

#![deny(unsafe_code)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::match_same_arms)]

pub mod chars;
mod builder;
mod chunk;
mod error;
mod field;
mod limits;
mod receiver;
mod request;
mod response;

pub use builder::{TxRequest, TxResponse};
pub use chunk::{ChunkDecoder, ChunkHeader, ChunkProgress, ChunkedEncoder};
pub use error::ParseError;
pub use field::{FieldLine, HeadersDecoder};
pub use limits::ParseLimits;
pub use receiver::{RequestReceiver, ResponseReceiver, Rx};
pub use request::{RequestLine, RequestLineDecoder};
pub use response::{StatusLine, StatusLineDecoder};

// Re-export the shared message types so hosts only need one dependency.
pub use keel_core::{are_headers_split, Headers, Method, StatusCode, Version};

/// Progress of an incremental decode call.
///
/// `Incomplete` means the decoder consumed everything it was given and needs
/// more bytes; `Complete` means the construct ended and any unconsumed bytes
/// belong to whatever follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The construct was fully decoded.
    Complete,
    /// More bytes are required.
    Incomplete,
}
