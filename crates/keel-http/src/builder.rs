//! Outgoing message builders.
//!
//! [`TxRequest`] and [`TxResponse`] assemble wire-ready messages. Header
//! values are screened with [`are_headers_split`] before they are accepted,
//! so a message built here can never smuggle an extra blank line — the
//! response-splitting injection — into the header block.

use keel_core::{are_headers_split, Headers, Method, StatusCode, Version};

use crate::chars::is_tchar;
use crate::chunk::ChunkedEncoder;
use crate::request::RequestLine;
use crate::response::StatusLine;
use crate::ParseError;

fn checked_add_header(headers: &mut Headers, name: &str, value: &str) -> Result<(), ParseError> {
    if name.is_empty() || !name.bytes().all(is_tchar) {
        return Err(ParseError::MalformedSyntax);
    }
    if value.bytes().any(|b| b == 0) {
        return Err(ParseError::MalformedSyntax);
    }
    let mut line = Vec::with_capacity(name.len() + value.len() + 4);
    line.extend_from_slice(name.as_bytes());
    line.extend_from_slice(b": ");
    line.extend_from_slice(value.as_bytes());
    line.extend_from_slice(b"\r\n");
    if are_headers_split(&line) {
        return Err(ParseError::HeaderSplitAttempt);
    }
    headers.add(name, value.as_bytes());
    Ok(())
}

/// Builder for an outgoing HTTP/1.1 request.
///
/// ```
/// use keel_http::{Method, TxRequest};
///
/// let mut request = TxRequest::new(Method::Get, "/hello");
/// request.add_header("Host", "example.com").unwrap();
/// assert_eq!(
///     request.encode(),
///     b"GET /hello HTTP/1.1\r\nhost: example.com\r\n\r\n"
/// );
/// ```
#[derive(Debug)]
pub struct TxRequest {
    method: Method,
    uri: String,
    version: Version,
    headers: Headers,
    body: Option<Vec<u8>>,
    chunked: bool,
}

impl TxRequest {
    /// Create a request for the given method and target.
    #[must_use]
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            version: Version::HTTP_11,
            headers: Headers::new(),
            body: None,
            chunked: false,
        }
    }

    /// Set the protocol version (HTTP/1.1 by default).
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// The headers added so far.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Add a header field.
    ///
    /// The name must be an RFC 7230 token. The value is rejected with
    /// [`ParseError::HeaderSplitAttempt`] if its serialised form would
    /// embed a blank line, and with [`ParseError::MalformedSyntax`] if it
    /// contains a NUL byte.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<(), ParseError> {
        checked_add_header(&mut self.headers, name, value)
    }

    /// Set a fixed-length body; adds the matching `content-length` header
    /// and leaves chunked mode.
    pub fn set_body(&mut self, body: &[u8]) {
        self.headers
            .set("content-length", body.len().to_string().as_bytes());
        self.body = Some(body.to_vec());
        self.chunked = false;
    }

    /// Switch to chunked emission. The encoded head carries
    /// `transfer-encoding: chunked`; frame the body with
    /// [`send_chunk`](Self::send_chunk) and
    /// [`send_final_chunk`](Self::send_final_chunk).
    pub fn set_chunked(&mut self) {
        self.headers.remove("content-length");
        self.body = None;
        self.chunked = true;
    }

    /// True if the request will be sent with a chunked body.
    #[must_use]
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// Encode the message head and any fixed-length body.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        RequestLine::new(self.method.as_str(), &self.uri, self.version).encode_into(&mut buf);
        self.headers.encode_into(&mut buf);
        if self.chunked {
            buf.extend_from_slice(b"transfer-encoding: chunked\r\n");
        }
        buf.extend_from_slice(b"\r\n");
        if let Some(body) = &self.body {
            buf.extend_from_slice(body);
        }
        buf
    }

    /// Encode one body chunk. Only meaningful after
    /// [`set_chunked`](Self::set_chunked); empty data encodes nothing.
    #[must_use]
    pub fn send_chunk(&self, data: &[u8]) -> Vec<u8> {
        debug_assert!(self.chunked, "send_chunk on a non-chunked request");
        let mut buf = Vec::with_capacity(data.len() + 16);
        ChunkedEncoder::encode_chunk(data, &mut buf);
        buf
    }

    /// Encode the terminating zero chunk with optional trailers.
    #[must_use]
    pub fn send_final_chunk(&self, trailers: Option<&Headers>) -> Vec<u8> {
        debug_assert!(self.chunked, "send_final_chunk on a non-chunked request");
        let mut buf = Vec::with_capacity(32);
        ChunkedEncoder::encode_last(trailers, &mut buf);
        buf
    }
}

/// Builder for an outgoing HTTP/1.1 response.
///
/// The reason phrase defaults to the canonical one for the status code
/// (empty for unregistered codes).
#[derive(Debug)]
pub struct TxResponse {
    status: StatusCode,
    reason: String,
    version: Version,
    headers: Headers,
    body: Option<Vec<u8>>,
    chunked: bool,
}

impl TxResponse {
    /// Create a response with the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: status.canonical_reason().to_string(),
            version: Version::HTTP_11,
            headers: Headers::new(),
            body: None,
            chunked: false,
        }
    }

    /// Set the protocol version (HTTP/1.1 by default).
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Replace the reason phrase. CR, LF and NUL are rejected — a reason
    /// can otherwise contain arbitrary text.
    pub fn set_reason(&mut self, reason: &str) -> Result<(), ParseError> {
        if reason.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0) {
            return Err(ParseError::MalformedSyntax);
        }
        self.reason.clear();
        self.reason.push_str(reason);
        Ok(())
    }

    /// The headers added so far.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Add a header field. See [`TxRequest::add_header`].
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<(), ParseError> {
        checked_add_header(&mut self.headers, name, value)
    }

    /// Set a fixed-length body; adds the matching `content-length` header
    /// and leaves chunked mode.
    pub fn set_body(&mut self, body: &[u8]) {
        self.headers
            .set("content-length", body.len().to_string().as_bytes());
        self.body = Some(body.to_vec());
        self.chunked = false;
    }

    /// Switch to chunked emission. See [`TxRequest::set_chunked`].
    pub fn set_chunked(&mut self) {
        self.headers.remove("content-length");
        self.body = None;
        self.chunked = true;
    }

    /// True if the response will be sent with a chunked body.
    #[must_use]
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    /// Encode the message head and any fixed-length body.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        StatusLine::with_reason(self.version, self.status, &self.reason).encode_into(&mut buf);
        self.headers.encode_into(&mut buf);
        if self.chunked {
            buf.extend_from_slice(b"transfer-encoding: chunked\r\n");
        }
        buf.extend_from_slice(b"\r\n");
        if let Some(body) = &self.body {
            buf.extend_from_slice(body);
        }
        buf
    }

    /// Encode one body chunk. Only meaningful after
    /// [`set_chunked`](Self::set_chunked); empty data encodes nothing.
    #[must_use]
    pub fn send_chunk(&self, data: &[u8]) -> Vec<u8> {
        debug_assert!(self.chunked, "send_chunk on a non-chunked response");
        let mut buf = Vec::with_capacity(data.len() + 16);
        ChunkedEncoder::encode_chunk(data, &mut buf);
        buf
    }

    /// Encode the terminating zero chunk with optional trailers.
    #[must_use]
    pub fn send_final_chunk(&self, trailers: Option<&Headers>) -> Vec<u8> {
        debug_assert!(self.chunked, "send_final_chunk on a non-chunked response");
        let mut buf = Vec::with_capacity(32);
        ChunkedEncoder::encode_last(trailers, &mut buf);
        buf
    }
}
