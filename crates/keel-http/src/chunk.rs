//! Chunked transfer coding.
//!
//! [`ChunkDecoder`] incrementally parses a chunked message body: hex chunk
//! sizes with optional extensions, chunk data, and the trailer section after
//! the zero chunk. [`ChunkedEncoder`] produces the symmetric wire form for
//! outgoing bodies.

use keel_core::Headers;

use crate::chars::hex_digit_value;
use crate::field::HeadersDecoder;
use crate::{ParseError, ParseLimits, Progress};

/// The size line of one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkHeader {
    size: u64,
    extension: String,
}

impl ChunkHeader {
    /// The chunk size in octets.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The chunk extension after `;`, uninterpreted; empty when absent.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// True for the terminating zero chunk.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.size == 0
    }
}

/// What a [`ChunkDecoder::decode`] call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkProgress {
    /// More bytes are required.
    Incomplete,
    /// One data chunk completed; its header and data are readable on the
    /// decoder until the next call.
    Chunk,
    /// The zero chunk and its trailers completed; the body is finished.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    /// Reset per-chunk storage, then read the size line.
    SizeStart,
    /// Hex size digits.
    Size,
    /// Bytes after `;` on the size line.
    Extension,
    /// LF terminating the size line.
    HeaderLf,
    /// Chunk data octets.
    Data,
    /// CR after the data.
    DataCr,
    /// LF after the data.
    DataLf,
    /// Trailer headers after the zero chunk.
    Trailers,
    /// Body finished.
    Done,
}

/// Incremental decoder for a chunked body.
#[derive(Debug)]
pub struct ChunkDecoder {
    header: ChunkHeader,
    data: Vec<u8>,
    remaining: u64,
    digit_seen: bool,
    trailer_decoder: HeadersDecoder,
    trailers: Headers,
    state: ChunkState,
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkDecoder {
    /// Create a chunked-body decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            header: ChunkHeader::default(),
            data: Vec::new(),
            remaining: 0,
            digit_seen: false,
            trailer_decoder: HeadersDecoder::new(),
            trailers: Headers::new(),
            state: ChunkState::SizeStart,
        }
    }

    /// The header of the chunk most recently reported by `decode`.
    #[must_use]
    pub fn header(&self) -> &ChunkHeader {
        &self.header
    }

    /// The data of the chunk most recently reported by `decode`. The view
    /// is valid until the next `decode` call.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Trailer headers. Populated once the zero chunk completes; empty for
    /// a message without trailers.
    #[must_use]
    pub fn trailers(&self) -> &Headers {
        &self.trailers
    }

    /// True once the terminating zero chunk has been decoded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == ChunkState::Done
    }

    /// Reset for the next message, keeping allocations.
    pub fn clear(&mut self) {
        self.header = ChunkHeader::default();
        self.data.clear();
        self.remaining = 0;
        self.digit_seen = false;
        self.trailer_decoder.clear();
        self.trailers.clear();
        self.state = ChunkState::SizeStart;
    }

    /// Consume bytes until one chunk completes, the body finishes, or the
    /// input runs out. At most one [`ChunkProgress::Chunk`] is reported per
    /// call; residual bytes belong to the next call.
    pub fn decode(
        &mut self,
        bytes: &[u8],
        limits: &ParseLimits,
    ) -> Result<(ChunkProgress, usize), ParseError> {
        let mut i = 0;
        loop {
            match self.state {
                ChunkState::SizeStart => {
                    self.header = ChunkHeader::default();
                    self.data.clear();
                    self.digit_seen = false;
                    self.state = ChunkState::Size;
                }
                ChunkState::Size => {
                    let Some(&b) = bytes.get(i) else {
                        return Ok((ChunkProgress::Incomplete, i));
                    };
                    i += 1;
                    if let Some(digit) = hex_digit_value(b) {
                        self.digit_seen = true;
                        self.header.size = self
                            .header
                            .size
                            .checked_mul(16)
                            .and_then(|size| size.checked_add(u64::from(digit)))
                            .ok_or(ParseError::InvalidChunkSize)?;
                        if self.header.size > limits.max_chunk_size {
                            return Err(ParseError::InvalidChunkSize);
                        }
                    } else if !self.digit_seen {
                        return Err(ParseError::InvalidChunkSize);
                    } else if b == b';' {
                        self.state = ChunkState::Extension;
                    } else if b == b'\r' {
                        self.state = ChunkState::HeaderLf;
                    } else if b == b'\n' {
                        if limits.strict_crlf {
                            return Err(ParseError::StrictCrlfViolation);
                        }
                        self.finish_size_line();
                    } else {
                        return Err(ParseError::InvalidChunkSize);
                    }
                }
                ChunkState::Extension => {
                    let Some(&b) = bytes.get(i) else {
                        return Ok((ChunkProgress::Incomplete, i));
                    };
                    i += 1;
                    if b == b'\r' {
                        self.state = ChunkState::HeaderLf;
                    } else if b == b'\n' {
                        if limits.strict_crlf {
                            return Err(ParseError::StrictCrlfViolation);
                        }
                        self.finish_size_line();
                    } else {
                        if self.header.extension.len() >= limits.max_line_length {
                            return Err(ParseError::LengthExceeded);
                        }
                        self.header.extension.push(b as char);
                    }
                }
                ChunkState::HeaderLf => {
                    let Some(&b) = bytes.get(i) else {
                        return Ok((ChunkProgress::Incomplete, i));
                    };
                    i += 1;
                    if b != b'\n' {
                        return Err(ParseError::MalformedSyntax);
                    }
                    self.finish_size_line();
                }
                ChunkState::Data => {
                    if i == bytes.len() {
                        return Ok((ChunkProgress::Incomplete, i));
                    }
                    let available = bytes.len() - i;
                    let take = self.remaining.min(available as u64) as usize;
                    self.data.extend_from_slice(&bytes[i..i + take]);
                    self.remaining -= take as u64;
                    i += take;
                    if self.remaining == 0 {
                        self.state = ChunkState::DataCr;
                    }
                }
                ChunkState::DataCr => {
                    let Some(&b) = bytes.get(i) else {
                        return Ok((ChunkProgress::Incomplete, i));
                    };
                    i += 1;
                    if b == b'\r' {
                        self.state = ChunkState::DataLf;
                    } else if b == b'\n' && !limits.strict_crlf {
                        self.state = ChunkState::SizeStart;
                        return Ok((ChunkProgress::Chunk, i));
                    } else {
                        return Err(ParseError::MalformedSyntax);
                    }
                }
                ChunkState::DataLf => {
                    let Some(&b) = bytes.get(i) else {
                        return Ok((ChunkProgress::Incomplete, i));
                    };
                    i += 1;
                    if b != b'\n' {
                        return Err(ParseError::MalformedSyntax);
                    }
                    self.state = ChunkState::SizeStart;
                    return Ok((ChunkProgress::Chunk, i));
                }
                ChunkState::Trailers => {
                    let (progress, used) =
                        self.trailer_decoder
                            .decode(&bytes[i..], limits, &mut self.trailers)?;
                    i += used;
                    match progress {
                        Progress::Incomplete => return Ok((ChunkProgress::Incomplete, i)),
                        Progress::Complete => {
                            self.state = ChunkState::Done;
                            return Ok((ChunkProgress::Complete, i));
                        }
                    }
                }
                ChunkState::Done => return Ok((ChunkProgress::Complete, i)),
            }
        }
    }

    fn finish_size_line(&mut self) {
        if self.header.is_last() {
            self.state = ChunkState::Trailers;
        } else {
            self.remaining = self.header.size;
            self.state = ChunkState::Data;
        }
    }
}

/// Encoder for chunked bodies.
///
/// Each chunk is framed as `hex-size [";" extension] CRLF data CRLF`; the
/// body terminates with `0 CRLF trailers CRLF`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkedEncoder;

impl ChunkedEncoder {
    /// Append one data chunk to `buf`.
    ///
    /// Empty data is skipped entirely — a zero-size chunk would terminate
    /// the body; use [`encode_last`](Self::encode_last) for that.
    pub fn encode_chunk(data: &[u8], buf: &mut Vec<u8>) {
        Self::encode_chunk_with_extension(data, "", buf);
    }

    /// Append one data chunk with a chunk extension to `buf`.
    pub fn encode_chunk_with_extension(data: &[u8], extension: &str, buf: &mut Vec<u8>) {
        if data.is_empty() {
            return;
        }
        buf.extend_from_slice(format!("{:x}", data.len()).as_bytes());
        if !extension.is_empty() {
            buf.push(b';');
            buf.extend_from_slice(extension.as_bytes());
        }
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(data);
        buf.extend_from_slice(b"\r\n");
    }

    /// Append the terminating zero chunk, with optional trailers.
    pub fn encode_last(trailers: Option<&Headers>, buf: &mut Vec<u8>) {
        buf.extend_from_slice(b"0\r\n");
        if let Some(trailers) = trailers {
            trailers.encode_into(buf);
        }
        buf.extend_from_slice(b"\r\n");
    }
}
