//! Parse error taxonomy.

use std::fmt;

/// HTTP parsing error.
///
/// Every error is terminal for its connection: once a receiver reports one
/// it parks in a failed state and ignores further input. A server host
/// should answer `400 Bad Request` and close the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// A byte not permitted by the current parser state.
    MalformedSyntax,
    /// A configured maximum was surpassed.
    LengthExceeded,
    /// Bare LF received while strict CRLF parsing is enabled.
    StrictCrlfViolation,
    /// Content-Length is not a valid non-negative integer.
    InvalidContentLength,
    /// Chunk size is not valid hex or exceeds the configured cap.
    InvalidChunkSize,
    /// A user-supplied header value contains an embedded blank line.
    HeaderSplitAttempt,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedSyntax => write!(f, "malformed syntax"),
            Self::LengthExceeded => write!(f, "configured length limit exceeded"),
            Self::StrictCrlfViolation => write!(f, "bare LF under strict CRLF parsing"),
            Self::InvalidContentLength => write!(f, "invalid content-length"),
            Self::InvalidChunkSize => write!(f, "invalid chunk size"),
            Self::HeaderSplitAttempt => write!(f, "header value would split the message"),
        }
    }
}

impl std::error::Error for ParseError {}
