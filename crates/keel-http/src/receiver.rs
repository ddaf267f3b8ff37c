//! Per-connection message receivers.
//!
//! [`RequestReceiver`] and [`ResponseReceiver`] sequence start line →
//! headers → body (fixed-length or chunked with trailers) over arbitrarily
//! fragmented input, reporting one [`Rx`] signal per call. They share the
//! header/body engine; only the start line and the body-presence rules
//! differ between the two sides.
//!
//! All parse failures are terminal: the receiver parks in a failed state,
//! keeps reporting [`Rx::Invalid`] without consuming, and exposes the error
//! kind through `error()`. A server host should answer `400 Bad Request`
//! and close the transport.

use keel_core::Headers;

use crate::chunk::{ChunkDecoder, ChunkHeader, ChunkProgress};
use crate::field::HeadersDecoder;
use crate::request::{RequestLine, RequestLineDecoder};
use crate::response::{StatusLine, StatusLineDecoder};
use crate::{ParseError, ParseLimits, Progress};

/// Receiver output signal, one per [`receive`](RequestReceiver::receive)
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rx {
    /// The message is invalid; the connection must be torn down.
    Invalid,
    /// The client expects a `100 Continue` interim response before sending
    /// the body. Emitted at most once per request.
    ExpectContinue,
    /// More bytes are required.
    Incomplete,
    /// A complete message was received.
    Valid,
    /// One body chunk was received; read it before the next call.
    Chunk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageState {
    StartLine,
    Headers,
    Body,
    Chunked,
    Complete,
    Failed,
}

/// How the message body is framed, decided from the header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    None,
    Fixed(u64),
    Chunked,
}

/// The shared headers/body half of a receiver.
#[derive(Debug)]
struct BodyEngine {
    headers_decoder: HeadersDecoder,
    headers: Headers,
    body: Vec<u8>,
    remaining: u64,
    chunks: ChunkDecoder,
    chunk_total: u64,
}

impl BodyEngine {
    fn new() -> Self {
        Self {
            headers_decoder: HeadersDecoder::new(),
            headers: Headers::new(),
            body: Vec::new(),
            remaining: 0,
            chunks: ChunkDecoder::new(),
            chunk_total: 0,
        }
    }

    fn clear(&mut self) {
        self.headers_decoder.clear();
        self.headers.clear();
        self.body.clear();
        self.remaining = 0;
        self.chunks.clear();
        self.chunk_total = 0;
    }

    /// Copy up to `remaining` octets into the body buffer.
    fn decode_fixed(&mut self, bytes: &[u8]) -> (Progress, usize) {
        let take = self.remaining.min(bytes.len() as u64) as usize;
        self.body.extend_from_slice(&bytes[..take]);
        self.remaining -= take as u64;
        if self.remaining == 0 {
            (Progress::Complete, take)
        } else {
            (Progress::Incomplete, take)
        }
    }

    /// Advance the chunk engine, enforcing the aggregate body cap.
    fn decode_chunked(
        &mut self,
        bytes: &[u8],
        limits: &ParseLimits,
    ) -> Result<(ChunkProgress, usize), ParseError> {
        let (progress, used) = self.chunks.decode(bytes, limits)?;
        if progress == ChunkProgress::Chunk {
            self.chunk_total += self.chunks.header().size();
            if self.chunk_total > limits.max_body_size {
                return Err(ParseError::LengthExceeded);
            }
        }
        Ok((progress, used))
    }
}

/// Decide the body framing from a completed header block.
///
/// A `transfer-encoding` list must end in `chunked` (a list of only
/// `identity` tokens means an unframed body); any other coding is rejected
/// per RFC 7230 §3.3.1. A chunked coding takes precedence over any
/// `content-length` that is also present.
fn body_framing(headers: &Headers, limits: &ParseLimits) -> Result<Framing, ParseError> {
    if let Some(value) = headers.find("transfer-encoding") {
        if chunked_coding(value)? {
            return Ok(Framing::Chunked);
        }
    }
    match headers.content_length() {
        0 => Ok(Framing::None),
        -1 => Err(ParseError::InvalidContentLength),
        n => {
            let n = n as u64;
            if n > limits.max_body_size {
                Err(ParseError::LengthExceeded)
            } else {
                Ok(Framing::Fixed(n))
            }
        }
    }
}

fn chunked_coding(value: &[u8]) -> Result<bool, ParseError> {
    let codings: Vec<&[u8]> = value
        .split(|&b| b == b',')
        .map(trim_ws)
        .filter(|coding| !coding.is_empty())
        .collect();
    let Some(last) = codings.last() else {
        return Ok(false);
    };
    if last.eq_ignore_ascii_case(b"chunked") {
        for coding in &codings[..codings.len() - 1] {
            if !coding.eq_ignore_ascii_case(b"identity") {
                return Err(ParseError::MalformedSyntax);
            }
        }
        Ok(true)
    } else if codings
        .iter()
        .all(|coding| coding.eq_ignore_ascii_case(b"identity"))
    {
        Ok(false)
    } else {
        Err(ParseError::MalformedSyntax)
    }
}

fn trim_ws(mut bytes: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = bytes {
        bytes = rest;
    }
    bytes
}

/// Incremental receiver for HTTP/1.1 requests (the server side).
#[derive(Debug)]
pub struct RequestReceiver {
    limits: ParseLimits,
    line: RequestLineDecoder,
    engine: BodyEngine,
    continue_signalled: bool,
    error: Option<ParseError>,
    state: MessageState,
}

impl Default for RequestReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestReceiver {
    /// Create a request receiver with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(ParseLimits::default())
    }

    /// Create a request receiver with explicit limits.
    #[must_use]
    pub fn with_limits(limits: ParseLimits) -> Self {
        Self {
            limits,
            line: RequestLineDecoder::new(),
            engine: BodyEngine::new(),
            continue_signalled: false,
            error: None,
            state: MessageState::StartLine,
        }
    }

    /// The configured limits.
    #[must_use]
    pub fn limits(&self) -> &ParseLimits {
        &self.limits
    }

    /// Feed received bytes.
    ///
    /// Returns one [`Rx`] signal and the number of bytes consumed; residual
    /// bytes belong to the next call (or, after [`Rx::Valid`] and a
    /// [`clear`](Self::clear), to the next pipelined message).
    pub fn receive(&mut self, bytes: &[u8]) -> (Rx, usize) {
        let mut consumed = 0;
        loop {
            match self.state {
                MessageState::Failed => return (Rx::Invalid, consumed),
                MessageState::Complete => return (Rx::Valid, consumed),
                MessageState::StartLine => {
                    match self.line.decode(&bytes[consumed..], &self.limits) {
                        Ok((Progress::Complete, used)) => {
                            consumed += used;
                            self.state = MessageState::Headers;
                        }
                        Ok((Progress::Incomplete, used)) => {
                            return (Rx::Incomplete, consumed + used);
                        }
                        Err(error) => return self.fail(error, consumed),
                    }
                }
                MessageState::Headers => {
                    let engine = &mut self.engine;
                    match engine.headers_decoder.decode(
                        &bytes[consumed..],
                        &self.limits,
                        &mut engine.headers,
                    ) {
                        Ok((Progress::Complete, used)) => {
                            consumed += used;
                            match body_framing(&engine.headers, &self.limits) {
                                Ok(Framing::None) => {
                                    self.state = MessageState::Complete;
                                    return (Rx::Valid, consumed);
                                }
                                Ok(Framing::Fixed(length)) => {
                                    engine.remaining = length;
                                    engine.body.reserve(length as usize);
                                    self.state = MessageState::Body;
                                }
                                Ok(Framing::Chunked) => self.state = MessageState::Chunked,
                                Err(error) => return self.fail(error, consumed),
                            }
                            // A body follows: give the host its one chance
                            // to send 100 Continue before we touch it.
                            if self.engine.headers.expect_continue() && !self.continue_signalled {
                                self.continue_signalled = true;
                                return (Rx::ExpectContinue, consumed);
                            }
                        }
                        Ok((Progress::Incomplete, used)) => {
                            return (Rx::Incomplete, consumed + used);
                        }
                        Err(error) => return self.fail(error, consumed),
                    }
                }
                MessageState::Body => {
                    let (progress, used) = self.engine.decode_fixed(&bytes[consumed..]);
                    consumed += used;
                    if progress == Progress::Complete {
                        self.state = MessageState::Complete;
                        return (Rx::Valid, consumed);
                    }
                    return (Rx::Incomplete, consumed);
                }
                MessageState::Chunked => {
                    match self.engine.decode_chunked(&bytes[consumed..], &self.limits) {
                        Ok((ChunkProgress::Chunk, used)) => return (Rx::Chunk, consumed + used),
                        Ok((ChunkProgress::Complete, used)) => {
                            self.state = MessageState::Complete;
                            return (Rx::Valid, consumed + used);
                        }
                        Ok((ChunkProgress::Incomplete, used)) => {
                            return (Rx::Incomplete, consumed + used);
                        }
                        Err(error) => return self.fail(error, consumed),
                    }
                }
            }
        }
    }

    /// The request line. Meaningful once the start line has been parsed.
    #[must_use]
    pub fn request(&self) -> &RequestLine {
        self.line.line()
    }

    /// The received headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.engine.headers
    }

    /// The fixed-length body received so far. Empty for chunked messages,
    /// whose data is delivered per [`Rx::Chunk`] via
    /// [`chunk_data`](Self::chunk_data).
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.engine.body
    }

    /// The header of the chunk last reported by [`Rx::Chunk`].
    #[must_use]
    pub fn chunk(&self) -> &ChunkHeader {
        self.engine.chunks.header()
    }

    /// The data of the chunk last reported by [`Rx::Chunk`]. Valid until
    /// the next `receive` call.
    #[must_use]
    pub fn chunk_data(&self) -> &[u8] {
        self.engine.chunks.data()
    }

    /// Trailer headers of a chunked message; empty when absent.
    #[must_use]
    pub fn trailers(&self) -> &Headers {
        self.engine.chunks.trailers()
    }

    /// The terminal parse error, if the receiver has failed.
    #[must_use]
    pub fn error(&self) -> Option<ParseError> {
        self.error
    }

    /// True once a complete message has been received.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == MessageState::Complete
    }

    /// Reset for the next pipelined message. O(1): buffers are emptied but
    /// keep their allocations.
    pub fn clear(&mut self) {
        self.line.clear();
        self.engine.clear();
        self.continue_signalled = false;
        self.error = None;
        self.state = MessageState::StartLine;
    }

    fn fail(&mut self, error: ParseError, consumed: usize) -> (Rx, usize) {
        self.error = Some(error);
        self.state = MessageState::Failed;
        (Rx::Invalid, consumed)
    }
}

/// Incremental receiver for HTTP/1.1 responses (the client side).
#[derive(Debug)]
pub struct ResponseReceiver {
    limits: ParseLimits,
    line: StatusLineDecoder,
    engine: BodyEngine,
    head_request: bool,
    error: Option<ParseError>,
    state: MessageState,
}

impl Default for ResponseReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseReceiver {
    /// Create a response receiver with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(ParseLimits::default())
    }

    /// Create a response receiver with explicit limits.
    #[must_use]
    pub fn with_limits(limits: ParseLimits) -> Self {
        Self {
            limits,
            line: StatusLineDecoder::new(),
            engine: BodyEngine::new(),
            head_request: false,
            error: None,
            state: MessageState::StartLine,
        }
    }

    /// The configured limits.
    #[must_use]
    pub fn limits(&self) -> &ParseLimits {
        &self.limits
    }

    /// Tell the receiver the next response answers a HEAD request, which
    /// carries no body regardless of its framing headers. This hint comes
    /// from the host's request/response correlator and is cleared by
    /// [`clear`](Self::clear).
    pub fn set_head_request(&mut self, head: bool) {
        self.head_request = head;
    }

    /// Feed received bytes. See [`RequestReceiver::receive`].
    pub fn receive(&mut self, bytes: &[u8]) -> (Rx, usize) {
        let mut consumed = 0;
        loop {
            match self.state {
                MessageState::Failed => return (Rx::Invalid, consumed),
                MessageState::Complete => return (Rx::Valid, consumed),
                MessageState::StartLine => {
                    match self.line.decode(&bytes[consumed..], &self.limits) {
                        Ok((Progress::Complete, used)) => {
                            consumed += used;
                            self.state = MessageState::Headers;
                        }
                        Ok((Progress::Incomplete, used)) => {
                            return (Rx::Incomplete, consumed + used);
                        }
                        Err(error) => return self.fail(error, consumed),
                    }
                }
                MessageState::Headers => {
                    let engine = &mut self.engine;
                    match engine.headers_decoder.decode(
                        &bytes[consumed..],
                        &self.limits,
                        &mut engine.headers,
                    ) {
                        Ok((Progress::Complete, used)) => {
                            consumed += used;
                            // HEAD responses and 1xx/204/304 end at the
                            // header block whatever the framing headers say.
                            if self.head_request || !self.line.line().status().allows_body() {
                                self.state = MessageState::Complete;
                                return (Rx::Valid, consumed);
                            }
                            match body_framing(&engine.headers, &self.limits) {
                                Ok(Framing::None) => {
                                    self.state = MessageState::Complete;
                                    return (Rx::Valid, consumed);
                                }
                                Ok(Framing::Fixed(length)) => {
                                    engine.remaining = length;
                                    engine.body.reserve(length as usize);
                                    self.state = MessageState::Body;
                                }
                                Ok(Framing::Chunked) => self.state = MessageState::Chunked,
                                Err(error) => return self.fail(error, consumed),
                            }
                        }
                        Ok((Progress::Incomplete, used)) => {
                            return (Rx::Incomplete, consumed + used);
                        }
                        Err(error) => return self.fail(error, consumed),
                    }
                }
                MessageState::Body => {
                    let (progress, used) = self.engine.decode_fixed(&bytes[consumed..]);
                    consumed += used;
                    if progress == Progress::Complete {
                        self.state = MessageState::Complete;
                        return (Rx::Valid, consumed);
                    }
                    return (Rx::Incomplete, consumed);
                }
                MessageState::Chunked => {
                    match self.engine.decode_chunked(&bytes[consumed..], &self.limits) {
                        Ok((ChunkProgress::Chunk, used)) => return (Rx::Chunk, consumed + used),
                        Ok((ChunkProgress::Complete, used)) => {
                            self.state = MessageState::Complete;
                            return (Rx::Valid, consumed + used);
                        }
                        Ok((ChunkProgress::Incomplete, used)) => {
                            return (Rx::Incomplete, consumed + used);
                        }
                        Err(error) => return self.fail(error, consumed),
                    }
                }
            }
        }
    }

    /// The status line. Meaningful once the start line has been parsed.
    #[must_use]
    pub fn response(&self) -> &StatusLine {
        self.line.line()
    }

    /// The received headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.engine.headers
    }

    /// The fixed-length body received so far. Empty for chunked messages.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.engine.body
    }

    /// The header of the chunk last reported by [`Rx::Chunk`].
    #[must_use]
    pub fn chunk(&self) -> &ChunkHeader {
        self.engine.chunks.header()
    }

    /// The data of the chunk last reported by [`Rx::Chunk`]. Valid until
    /// the next `receive` call.
    #[must_use]
    pub fn chunk_data(&self) -> &[u8] {
        self.engine.chunks.data()
    }

    /// Trailer headers of a chunked message; empty when absent.
    #[must_use]
    pub fn trailers(&self) -> &Headers {
        self.engine.chunks.trailers()
    }

    /// The terminal parse error, if the receiver has failed.
    #[must_use]
    pub fn error(&self) -> Option<ParseError> {
        self.error
    }

    /// True once a complete message has been received.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == MessageState::Complete
    }

    /// Reset for the next message. O(1): buffers are emptied but keep
    /// their allocations. The HEAD hint is cleared too.
    pub fn clear(&mut self) {
        self.line.clear();
        self.engine.clear();
        self.head_request = false;
        self.error = None;
        self.state = MessageState::StartLine;
    }

    fn fail(&mut self, error: ParseError, consumed: usize) -> (Rx, usize) {
        self.error = Some(error);
        self.state = MessageState::Failed;
        (Rx::Invalid, consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::StatusCode;

    #[test]
    fn simple_get_is_valid() {
        let mut receiver = RequestReceiver::new();
        let input = b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n";
        let (rx, consumed) = receiver.receive(input);
        assert_eq!(rx, Rx::Valid);
        assert_eq!(consumed, input.len());
        assert_eq!(receiver.request().method(), "GET");
        assert_eq!(receiver.request().uri(), "/hello");
        assert_eq!(receiver.headers().find("host"), Some(&b"x"[..]));
        assert_eq!(receiver.headers().content_length(), 0);
        assert!(receiver.is_complete());
    }

    #[test]
    fn fixed_length_body_is_copied() {
        let mut receiver = RequestReceiver::new();
        let input = b"POST /upload HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let (rx, consumed) = receiver.receive(input);
        assert_eq!(rx, Rx::Valid);
        assert_eq!(consumed, input.len());
        assert_eq!(receiver.body(), b"hello");
    }

    #[test]
    fn body_across_many_feeds() {
        let mut receiver = RequestReceiver::new();
        let (rx, _) = receiver.receive(b"POST / HTTP/1.1\r\nContent-Length: 6\r\n\r\nfoo");
        assert_eq!(rx, Rx::Incomplete);
        let (rx, consumed) = receiver.receive(b"bar");
        assert_eq!(rx, Rx::Valid);
        assert_eq!(consumed, 3);
        assert_eq!(receiver.body(), b"foobar");
    }

    #[test]
    fn chunked_response_delivers_chunks_then_valid() {
        let mut receiver = ResponseReceiver::new();
        let input =
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
        let (rx, consumed) = receiver.receive(input);
        assert_eq!(rx, Rx::Chunk);
        assert_eq!(receiver.chunk().size(), 5);
        assert_eq!(receiver.chunk_data(), b"hello");
        assert!(receiver.headers().is_chunked());

        let (rx, rest) = receiver.receive(&input[consumed..]);
        assert_eq!(rx, Rx::Valid);
        assert_eq!(consumed + rest, input.len());
        assert!(receiver.trailers().is_empty());
    }

    #[test]
    fn chunked_trailers_are_exposed() {
        let mut receiver = RequestReceiver::new();
        let input = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n\
3\r\nabc\r\n0\r\nX-Sum: 6\r\n\r\n";
        let (rx, consumed) = receiver.receive(input);
        assert_eq!(rx, Rx::Chunk);
        let (rx, _) = receiver.receive(&input[consumed..]);
        assert_eq!(rx, Rx::Valid);
        assert_eq!(receiver.trailers().find("x-sum"), Some(&b"6"[..]));
        assert!(receiver.chunk().is_last());
    }

    #[test]
    fn expect_continue_pauses_before_body() {
        let mut receiver = RequestReceiver::new();
        let head = b"PUT /file HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 3\r\n\r\n";
        let mut input = head.to_vec();
        input.extend_from_slice(b"abc");

        let (rx, consumed) = receiver.receive(&input);
        assert_eq!(rx, Rx::ExpectContinue);
        assert_eq!(consumed, head.len(), "body bytes stay unconsumed");

        // Host sends 100 Continue out of band, then resumes feeding.
        let (rx, consumed) = receiver.receive(&input[consumed..]);
        assert_eq!(rx, Rx::Valid);
        assert_eq!(consumed, 3);
        assert_eq!(receiver.body(), b"abc");
    }

    #[test]
    fn expect_continue_emitted_once() {
        let mut receiver = RequestReceiver::new();
        let (rx, _) =
            receiver.receive(b"PUT / HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 1\r\n\r\n");
        assert_eq!(rx, Rx::ExpectContinue);
        let (rx, _) = receiver.receive(b"");
        assert_eq!(rx, Rx::Incomplete);
        let (rx, _) = receiver.receive(b"x");
        assert_eq!(rx, Rx::Valid);
    }

    #[test]
    fn expect_without_body_is_just_valid() {
        let mut receiver = RequestReceiver::new();
        let (rx, _) = receiver.receive(b"GET / HTTP/1.1\r\nExpect: 100-continue\r\n\r\n");
        assert_eq!(rx, Rx::Valid);
    }

    #[test]
    fn folded_header_value_is_joined() {
        let mut receiver = RequestReceiver::new();
        let (rx, _) = receiver.receive(b"GET / HTTP/1.1\r\nX: a\r\n b\r\n\r\n");
        assert_eq!(rx, Rx::Valid);
        assert_eq!(receiver.headers().find("x"), Some(&b"a b"[..]));
    }

    #[test]
    fn duplicate_cookie_and_accept_merging() {
        let mut receiver = RequestReceiver::new();
        let (rx, _) = receiver.receive(
            b"GET / HTTP/1.1\r\nCookie: a=1\r\nCookie: b=2\r\n\
Accept: text/html\r\nAccept: text/plain\r\n\r\n",
        );
        assert_eq!(rx, Rx::Valid);
        assert_eq!(receiver.headers().find("cookie"), Some(&b"a=1; b=2"[..]));
        assert_eq!(
            receiver.headers().find("accept"),
            Some(&b"text/html, text/plain"[..])
        );
    }

    #[test]
    fn line_length_breach_is_invalid() {
        let limits = ParseLimits::default().with_max_line_length(16);
        let mut receiver = RequestReceiver::with_limits(limits);
        let (rx, _) =
            receiver.receive(b"GET / HTTP/1.1\r\nX-Long: aaaaaaaaaaaaaaaaaaaa\r\n\r\n");
        assert_eq!(rx, Rx::Invalid);
        assert_eq!(receiver.error(), Some(ParseError::LengthExceeded));
    }

    #[test]
    fn failed_receiver_stays_failed() {
        let mut receiver = RequestReceiver::new();
        let (rx, _) = receiver.receive(b"GET / HTTP/1.1\r\nContent-Length: nope\r\n\r\n");
        assert_eq!(rx, Rx::Invalid);
        assert_eq!(receiver.error(), Some(ParseError::InvalidContentLength));
        let (rx, consumed) = receiver.receive(b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(rx, Rx::Invalid);
        assert_eq!(consumed, 0);
    }

    #[test]
    fn content_length_over_cap_is_invalid() {
        let limits = ParseLimits::default().with_max_body_size(4);
        let mut receiver = RequestReceiver::with_limits(limits);
        let (rx, _) = receiver.receive(b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello");
        assert_eq!(rx, Rx::Invalid);
        assert_eq!(receiver.error(), Some(ParseError::LengthExceeded));
    }

    #[test]
    fn aggregate_chunked_body_cap_enforced() {
        let limits = ParseLimits::default()
            .with_max_body_size(6)
            .with_max_chunk_size(4);
        let mut receiver = RequestReceiver::with_limits(limits);
        let input = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n";
        let (rx, _) = receiver.receive(input);
        assert_eq!(rx, Rx::Incomplete);
        let (rx, _) = receiver.receive(b"4\r\naaaa\r\n");
        assert_eq!(rx, Rx::Chunk);
        let (rx, _) = receiver.receive(b"4\r\nbbbb\r\n");
        assert_eq!(rx, Rx::Invalid);
        assert_eq!(receiver.error(), Some(ParseError::LengthExceeded));
    }

    #[test]
    fn unknown_transfer_coding_is_invalid() {
        let mut receiver = ResponseReceiver::new();
        let (rx, _) =
            receiver.receive(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip\r\n\r\n");
        assert_eq!(rx, Rx::Invalid);
        assert_eq!(receiver.error(), Some(ParseError::MalformedSyntax));
    }

    #[test]
    fn chunked_must_be_final_coding() {
        let mut receiver = ResponseReceiver::new();
        let (rx, _) = receiver
            .receive(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked, identity\r\n\r\n");
        assert_eq!(rx, Rx::Invalid);
    }

    #[test]
    fn identity_coding_falls_back_to_content_length() {
        let mut receiver = ResponseReceiver::new();
        let input =
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: identity\r\nContent-Length: 2\r\n\r\nok";
        let (rx, _) = receiver.receive(input);
        assert_eq!(rx, Rx::Valid);
        assert_eq!(receiver.body(), b"ok");
    }

    #[test]
    fn chunked_wins_over_content_length() {
        let mut receiver = RequestReceiver::new();
        let input = b"POST / HTTP/1.1\r\nContent-Length: 3\r\n\
Transfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n";
        let (rx, consumed) = receiver.receive(input);
        assert_eq!(rx, Rx::Chunk);
        let (rx, _) = receiver.receive(&input[consumed..]);
        assert_eq!(rx, Rx::Valid);
    }

    #[test]
    fn head_response_has_no_body() {
        let mut receiver = ResponseReceiver::new();
        receiver.set_head_request(true);
        let input = b"HTTP/1.1 200 OK\r\nContent-Length: 1234\r\n\r\n";
        let (rx, consumed) = receiver.receive(input);
        assert_eq!(rx, Rx::Valid);
        assert_eq!(consumed, input.len());
        assert!(receiver.body().is_empty());
        assert_eq!(receiver.headers().content_length(), 1234);
    }

    #[test]
    fn bodyless_status_codes_end_at_headers() {
        for (input, code) in [
            (&b"HTTP/1.1 204 No Content\r\nContent-Length: 10\r\n\r\n"[..], 204),
            (b"HTTP/1.1 304 Not Modified\r\nContent-Length: 10\r\n\r\n", 304),
            (b"HTTP/1.1 100 Continue\r\n\r\n", 100),
        ] {
            let mut receiver = ResponseReceiver::new();
            let (rx, consumed) = receiver.receive(input);
            assert_eq!(rx, Rx::Valid, "code {code}");
            assert_eq!(consumed, input.len());
            assert_eq!(receiver.response().code(), code);
        }
    }

    #[test]
    fn pipelined_requests_leave_residual_bytes() {
        let mut receiver = RequestReceiver::new();
        let mut input = Vec::new();
        input.extend_from_slice(b"GET /a HTTP/1.1\r\n\r\n");
        input.extend_from_slice(b"GET /b HTTP/1.1\r\n\r\n");

        let (rx, consumed) = receiver.receive(&input);
        assert_eq!(rx, Rx::Valid);
        assert_eq!(consumed, 19);
        assert_eq!(receiver.request().uri(), "/a");

        receiver.clear();
        let (rx, rest) = receiver.receive(&input[consumed..]);
        assert_eq!(rx, Rx::Valid);
        assert_eq!(rest, 19);
        assert_eq!(receiver.request().uri(), "/b");
    }

    #[test]
    fn clear_resets_head_hint_and_state() {
        let mut receiver = ResponseReceiver::new();
        receiver.set_head_request(true);
        let (rx, _) = receiver.receive(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n");
        assert_eq!(rx, Rx::Valid);

        receiver.clear();
        let input = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
        let (rx, _) = receiver.receive(input);
        assert_eq!(rx, Rx::Valid);
        assert_eq!(receiver.body(), b"ok");
        assert_eq!(receiver.response().status(), StatusCode::OK);
    }

    #[test]
    fn byte_at_a_time_feeding_matches_single_feed() {
        let input: &[u8] = b"POST /items HTTP/1.1\r\nHost: example.com\r\n\
Cookie: a=1\r\nCookie: b=2\r\nContent-Length: 4\r\n\r\nbody";

        let mut whole = RequestReceiver::new();
        let (rx, consumed) = whole.receive(input);
        assert_eq!(rx, Rx::Valid);
        assert_eq!(consumed, input.len());

        let mut split = RequestReceiver::new();
        let mut events = Vec::new();
        for &b in input {
            let (rx, used) = split.receive(&[b]);
            assert_eq!(used, 1);
            if rx != Rx::Incomplete {
                events.push(rx);
            }
        }
        assert_eq!(events, [Rx::Valid]);
        assert_eq!(split.request(), whole.request());
        assert_eq!(split.headers(), whole.headers());
        assert_eq!(split.body(), whole.body());
    }

    #[test]
    fn garbage_start_line_is_invalid() {
        let mut receiver = RequestReceiver::new();
        let (rx, _) = receiver.receive(b"\x01\x02\x03\r\n\r\n");
        assert_eq!(rx, Rx::Invalid);
        assert_eq!(receiver.error(), Some(ParseError::MalformedSyntax));
    }

    #[test]
    fn close_connection_query_after_valid() {
        let mut receiver = RequestReceiver::new();
        let (rx, _) = receiver.receive(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n");
        assert_eq!(rx, Rx::Valid);
        assert!(receiver.headers().close_connection());
    }
}
