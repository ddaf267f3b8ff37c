//! HTTP/1.1 message types for the keel codec.
//!
//! This crate holds the data model shared by the wire codec: protocol
//! versions, request methods, status codes and the ordered headers
//! collection with its list-merge semantics. None of the types here parse
//! anything; the incremental state machines live in `keel-http`.

#![deny(unsafe_code)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::len_without_is_empty)]

mod headers;
mod method;
mod status;
mod version;

pub use headers::{are_headers_split, Headers};
pub use method::Method;
pub use status::StatusCode;
pub use version::Version;
