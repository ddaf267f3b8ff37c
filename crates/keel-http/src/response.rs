//! Status-line parsing and encoding.

use keel_core::{StatusCode, Version};

use crate::chars::{dec_digit_value, is_space_or_tab};
use crate::{ParseError, ParseLimits, Progress};

/// A parsed HTTP status line: `HTTP/M.N SP code SP reason`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    major: u8,
    minor: u8,
    code: u16,
    reason: String,
}

impl StatusLine {
    /// Build a status line for encoding, using the canonical reason phrase
    /// for the code (empty for unregistered codes).
    #[must_use]
    pub fn new(version: Version, code: StatusCode) -> Self {
        Self::with_reason(version, code, code.canonical_reason())
    }

    /// Build a status line with an explicit reason phrase.
    #[must_use]
    pub fn with_reason(version: Version, code: StatusCode, reason: &str) -> Self {
        Self {
            major: version.major(),
            minor: version.minor(),
            code: code.as_u16(),
            reason: reason.to_string(),
        }
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

    /// The status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code)
    }

    /// The numeric status code.
    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The reason phrase as received; may be empty.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Write the canonical wire form: `HTTP/M.N SP code SP reason\r\n`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.version().to_string().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.code.to_string().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.reason.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    fn clear(&mut self) {
        self.major = 0;
        self.minor = 0;
        self.code = 0;
        self.reason.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    HttpH,
    HttpT1,
    HttpT2,
    HttpP,
    Slash,
    Major,
    Dot,
    Minor,
    CodeWs,
    Code,
    AfterCode,
    Reason,
    Lf,
}

/// Incremental parser for the status line.
#[derive(Debug)]
pub struct StatusLineDecoder {
    line: StatusLine,
    digits: u8,
    ws_count: usize,
    state: LineState,
}

impl Default for StatusLineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLineDecoder {
    /// Create a status-line parser.
    #[must_use]
    pub fn new() -> Self {
        Self {
            line: StatusLine::default(),
            digits: 0,
            ws_count: 0,
            state: LineState::HttpH,
        }
    }

    /// The parsed line. Only meaningful after `decode` reported
    /// [`Progress::Complete`].
    #[must_use]
    pub fn line(&self) -> &StatusLine {
        &self.line
    }

    /// Reset for the next message, keeping allocations.
    pub fn clear(&mut self) {
        self.line.clear();
        self.digits = 0;
        self.ws_count = 0;
        self.state = LineState::HttpH;
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
                    self.ws_count = 0;
                    self.state = LineState::CodeWs;
                }
                LineState::CodeWs => {
                    if is_space_or_tab(b) {
                        self.ws_count += 1;
                        if self.ws_count > usize::from(limits.max_whitespace) {
                            return Err(ParseError::LengthExceeded);
                        }
                        i += 1;
                    } else if self.ws_count == 0 {
                        return Err(ParseError::MalformedSyntax);
                    } else {
                        self.state = LineState::Code;
                    }
                }
                LineState::Code => {
                    i += 1;
                    let Some(digit) = dec_digit_value(b) else {
                        return Err(ParseError::MalformedSyntax);
                    };
                    if self.digits == 0 && !(1..=5).contains(&digit) {
                        return Err(ParseError::MalformedSyntax);
                    }
                    self.line.code = self.line.code * 10 + u16::from(digit);
                    self.digits += 1;
                    if self.digits == 3 {
                        self.state = LineState::AfterCode;
                    }
                }
                LineState::AfterCode => {
                    i += 1;
                    if is_space_or_tab(b) {
                        self.state = LineState::Reason;
                    } else if b == b'\r' {
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
                LineState::Reason => {
                    i += 1;
                    if b == b'\r' {
                        self.state = LineState::Lf;
                    } else if b == b'\n' {
                        if limits.strict_crlf {
                            return Err(ParseError::StrictCrlfViolation);
                        }
                        return Ok((Progress::Complete, i));
                    } else {
                        if self.line.reason.len() >= limits.max_reason_length {
                            return Err(ParseError::LengthExceeded);
                        }
                        self.line.reason.push(b as char);
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
