//! Request-line parsing and encoding.

use keel_core::{Method, Version};

use crate::chars::{dec_digit_value, is_ctl, is_space_or_tab, is_tchar};
use crate::{ParseError, ParseLimits, Progress};

/// A parsed HTTP request line: `METHOD SP request-target SP HTTP/M.N`.
///
/// The method is kept as the raw token so unregistered methods survive
/// parsing; [`known_method`](Self::known_method) resolves the registered
/// ones. The request target is opaque to this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    method: String,
    uri: String,
    major: u8,
    minor: u8,
}

impl RequestLine {
    /// Build a request line for encoding.
    #[must_use]
    pub fn new(method: &str, uri: &str, version: Version) -> Self {
        Self {
            method: method.to_string(),
            uri: uri.to_string(),
            major: version.major(),
            minor: version.minor(),
        }
    }

    /// The method token as received.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The registered method, if the token names one.
    #[must_use]
    pub fn known_method(&self) -> Option<Method> {
        Method::from_bytes(self.method.as_bytes())
    }

    /// The request target.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The protocol version.
    #[must_use]
    pub fn version(&self) -> Version {
        Version::new(self.major, self.minor)
    }

    /// The major version digit.
    #[must_use]
    pub fn major(&self) -> u8 {
        self.major
    }

    /// The minor version digit.
    #[must_use]
    pub fn minor(&self) -> u8 {
        self.minor
    }

    /// Returns true if this is an HTTP/1.1 request.
    #[must_use]
    pub fn is_http11(&self) -> bool {
        self.major == 1 && self.minor == 1
    }

    /// Write the canonical wire form: `METHOD SP target SP HTTP/M.N\r\n`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.method.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.uri.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.version().to_string().as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    fn clear(&mut self) {
        self.method.clear();
        self.uri.clear();
        self.major = 0;
        self.minor = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    Method,
    MethodWs,
    Uri,
    UriWs,
    HttpH,
    HttpT1,
    HttpT2,
    HttpP,
    Slash,
    Major,
    Dot,
    Minor,
    Cr,
    Lf,
}

/// Incremental parser for the request line.
#[derive(Debug)]
pub struct RequestLineDecoder {
    line: RequestLine,
    ws_count: usize,
    state: LineState,
}

impl Default for RequestLineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestLineDecoder {
    /// Create a request-line parser.
    #[must_use]
    pub fn new() -> Self {
        Self {
            line: RequestLine::default(),
            ws_count: 0,
            state: LineState::Method,
        }
    }

    /// The parsed line. Only meaningful after `decode` reported
    /// [`Progress::Complete`].
    #[must_use]
    pub fn line(&self) -> &RequestLine {
        &self.line
    }

    /// Reset for the next message, keeping allocations.
    pub fn clear(&mut self) {
        self.line.clear();
        self.ws_count = 0;
        self.state = LineState::Method;
    }

    /// Consume bytes until the line completes or the input runs out.
    pub fn decode(
        &mut self,
        bytes: &[u8],
        limits: &ParseLimits,
    ) -> Result<(Progress, usize), ParseError> {
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            match self.state {
                LineState::Method => {
                    if is_tchar(b) {
                        if self.line.method.len() >= limits.max_method_length {
                            return Err(ParseError::LengthExceeded);
                        }
                        self.line.method.push(b as char);
                        i += 1;
                    } else if is_space_or_tab(b) && !self.line.method.is_empty() {
                        self.ws_count = 0;
                        self.state = LineState::MethodWs;
                    } else {
                        return Err(ParseError::MalformedSyntax);
                    }
                }
                LineState::MethodWs => {
                    if is_space_or_tab(b) {
                        self.ws_count += 1;
                        if self.ws_count > usize::from(limits.max_whitespace) {
                            return Err(ParseError::LengthExceeded);
                        }
                        i += 1;
                    } else {
                        self.state = LineState::Uri;
                    }
                }
                LineState::Uri => {
                    if is_space_or_tab(b) {
                        self.ws_count = 0;
                        self.state = LineState::UriWs;
                    } else if is_ctl(b) || !b.is_ascii() {
                        return Err(ParseError::MalformedSyntax);
                    } else {
                        if self.line.uri.len() >= limits.max_uri_length {
                            return Err(ParseError::LengthExceeded);
                        }
                        self.line.uri.push(b as char);
                        i += 1;
                    }
                }
                LineState::UriWs => {
                    if is_space_or_tab(b) {
                        self.ws_count += 1;
                        if self.ws_count > usize::from(limits.max_whitespace) {
                            return Err(ParseError::LengthExceeded);
                        }
                        i += 1;
                    } else {
                        self.state = LineState::HttpH;
                    }
                }
                LineState::HttpH => {
                    i += 1;
                    if b != b'H' {
                        return Err(ParseError::MalformedSyntax);
                    }
                    self.state = LineState::HttpT1;
                }
                LineState::HttpT1 => {
                    i += 1;
                    if b != b'T' {
                        return Err(ParseError::MalformedSyntax);
                    }
                    self.state = LineState::HttpT2;
                }
                LineState::HttpT2 => {
                    i += 1;
                    if b != b'T' {
                        return Err(ParseError::MalformedSyntax);
                    }
                    self.state = LineState::HttpP;
                }
                LineState::HttpP => {
                    i += 1;
                    if b != b'P' {
                        return Err(ParseError::MalformedSyntax);
                    }
                    self.state = LineState::Slash;
                }
                LineState::Slash => {
                    i += 1;
                    if b != b'/' {
                        return Err(ParseError::MalformedSyntax);
                    }
                    self.state = LineState::Major;
                }
                LineState::Major => {
                    i += 1;
                    let Some(digit) = dec_digit_value(b) else {
                        return Err(ParseError::MalformedSyntax);
                    };
                    self.line.major = digit;
                    self.state = LineState::Dot;
                }
                LineState::Dot => {
                    i += 1;
                    if b != b'.' {
                        return Err(ParseError::MalformedSyntax);
                    }
                    self.state = LineState::Minor;
                }
                LineState::Minor => {
                    i += 1;
                    let Some(digit) = dec_digit_value(b) else {
                        return Err(ParseError::MalformedSyntax);
                    };
                    self.line.minor = digit;
                    self.state = LineState::Cr;
                }
                LineState::Cr => {
                    i += 1;
                    if b == b'\r' {
                        self.state = LineState::Lf;
                    } else if b == b'\n' {
                        if limits.strict_crlf {
                            return Err(ParseError::StrictCrlfViolation);
                        }
                        return Ok((Progress::Complete, i));
                    } else {
                        return Err(ParseError::MalformedSyntax);
                    }
                }
                LineState::Lf => {
                    i += 1;
                    if b != b'\n' {
                        return Err(ParseError::MalformedSyntax);
                    }
                    return Ok((Progress::Complete, i));
                }
            }
        }
        Ok((Progress::Incomplete, i))
    }
}
