//! Header field-line parsing.
//!
//! [`FieldLine`] is the byte-at-a-time parser for a single `name: value`
//! line, including obsolete line folding; [`HeadersDecoder`] repeats it
//! until the blank line that terminates a header block (or chunk trailers),
//! merging each line into a [`Headers`] collection.
//!
//! Both parsers are restartable at any byte boundary: feeding a block one
//! byte at a time produces exactly the same result as feeding it whole.

use keel_core::Headers;

use crate::chars::{is_end_of_line, is_space_or_tab};
use crate::{ParseError, ParseLimits, Progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    /// Accumulating the field name.
    Name,
    /// Skipping leading whitespace before the value.
    ValueLeadingWs,
    /// Accumulating the value.
    Value,
    /// CR seen, expecting LF.
    Lf,
    /// Line terminator seen; the next byte decides between completion and
    /// an obsolete folded continuation.
    AfterLf,
}

/// Incremental parser for one header field line.
///
/// The name is lowercased as it is read; the value is kept raw. After a
/// completed line, [`clear`](Self::clear) resets the parser for the next
/// one without releasing its buffers.
#[derive(Debug)]
pub struct FieldLine {
    name: String,
    value: Vec<u8>,
    length: usize,
    ws_count: usize,
    state: FieldState,
}

impl Default for FieldLine {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldLine {
    /// Create an empty field-line parser.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: String::new(),
            value: Vec::new(),
            length: 0,
            ws_count: 0,
            state: FieldState::Name,
        }
    }

    /// Reset for the next line, keeping allocations.
    pub fn clear(&mut self) {
        self.name.clear();
        self.value.clear();
        self.length = 0;
        self.ws_count = 0;
        self.state = FieldState::Name;
    }

    /// The field name, lowercased.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field value in the form it was received.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The captured octet count (name plus value), used for the cumulative
    /// header-length guard.
    #[must_use]
    pub fn length(&self) -> usize {
        self.name.len() + self.value.len()
    }

    /// Consume bytes until the line completes or the input runs out.
    ///
    /// Returns the progress and the number of bytes consumed. A completed
    /// line leaves the first byte of the next line unconsumed — the parser
    /// needs that byte to distinguish a folded continuation from the end of
    /// the line, so completion is only reported once it has been seen.
    pub fn parse(
        &mut self,
        bytes: &[u8],
        limits: &ParseLimits,
    ) -> Result<(Progress, usize), ParseError> {
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];

            if self.state == FieldState::AfterLf {
                if is_space_or_tab(b) {
                    // Obsolete line folding: the terminator and leading
                    // whitespace of the continuation collapse to one SP.
                    self.value.push(b' ');
                    self.ws_count = 0;
                    self.state = FieldState::ValueLeadingWs;
                    continue;
                }
                return Ok((Progress::Complete, i));
            }

            i += 1;
            self.length += 1;
            if self.length > limits.max_line_length {
                return Err(ParseError::LengthExceeded);
            }

            match self.state {
                FieldState::Name => {
                    if b.is_ascii_alphabetic() || b == b'-' {
                        self.name.push(b.to_ascii_lowercase() as char);
                    } else if b == b':' {
                        if self.name.is_empty() {
                            return Err(ParseError::MalformedSyntax);
                        }
                        self.ws_count = 0;
                        self.state = FieldState::ValueLeadingWs;
                    } else {
                        return Err(ParseError::MalformedSyntax);
                    }
                }
                FieldState::ValueLeadingWs => {
                    if is_space_or_tab(b) {
                        self.ws_count += 1;
                        if self.ws_count > usize::from(limits.max_whitespace) {
                            return Err(ParseError::LengthExceeded);
                        }
                    } else {
                        self.state = FieldState::Value;
                        self.value_byte(b, limits)?;
                    }
                }
                FieldState::Value => self.value_byte(b, limits)?,
                FieldState::Lf => {
                    if b == b'\n' {
                        self.state = FieldState::AfterLf;
                    } else {
                        return Err(ParseError::MalformedSyntax);
                    }
                }
                FieldState::AfterLf => unreachable!("handled before consuming"),
            }
        }

        Ok((Progress::Incomplete, i))
    }

    fn value_byte(&mut self, b: u8, limits: &ParseLimits) -> Result<(), ParseError> {
        if !is_end_of_line(b) {
            self.value.push(b);
        } else if b == b'\r' {
            self.state = FieldState::Lf;
        } else if limits.strict_crlf {
            return Err(ParseError::StrictCrlfViolation);
        } else {
            self.state = FieldState::AfterLf;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    /// At the start of a line: a field line or the terminating blank line.
    LineStart,
    /// Inside a field line.
    Field,
    /// CR of the terminating blank line seen, expecting LF.
    BlankLf,
}

/// Incremental decoder for a header block (or chunk trailers).
///
/// Drives [`FieldLine`] until the terminating blank line, merging each
/// completed line into the supplied [`Headers`] and enforcing the
/// cumulative-length and field-count limits.
#[derive(Debug)]
pub struct HeadersDecoder {
    field: FieldLine,
    state: BlockState,
    length: u64,
}

impl Default for HeadersDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadersDecoder {
    /// Create a headers decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            field: FieldLine::new(),
            state: BlockState::LineStart,
            length: 0,
        }
    }

    /// Reset for the next message, keeping allocations.
    pub fn clear(&mut self) {
        self.field.clear();
        self.state = BlockState::LineStart;
        self.length = 0;
    }

    /// Consume bytes until the terminating blank line or the end of input.
    ///
    /// Completed field lines are merged into `headers` as they finish.
    pub fn decode(
        &mut self,
        bytes: &[u8],
        limits: &ParseLimits,
        headers: &mut Headers,
    ) -> Result<(Progress, usize), ParseError> {
        let mut i = 0;
        loop {
            match self.state {
                BlockState::LineStart => {
                    let Some(&b) = bytes.get(i) else {
                        return Ok((Progress::Incomplete, i));
                    };
                    if b == b'\r' {
                        i += 1;
                        self.state = BlockState::BlankLf;
                    } else if b == b'\n' {
                        if limits.strict_crlf {
                            return Err(ParseError::StrictCrlfViolation);
                        }
                        i += 1;
                        return Ok((Progress::Complete, i));
                    } else {
                        self.state = BlockState::Field;
                    }
                }
                BlockState::BlankLf => {
                    let Some(&b) = bytes.get(i) else {
                        return Ok((Progress::Incomplete, i));
                    };
                    if b != b'\n' {
                        return Err(ParseError::MalformedSyntax);
                    }
                    i += 1;
                    self.state = BlockState::LineStart;
                    return Ok((Progress::Complete, i));
                }
                BlockState::Field => {
                    let (progress, used) = self.field.parse(&bytes[i..], limits)?;
                    i += used;
                    match progress {
                        Progress::Incomplete => return Ok((Progress::Incomplete, i)),
                        Progress::Complete => {
                            self.length += self.field.length() as u64;
                            headers.add(self.field.name(), self.field.value());
                            if self.length > limits.max_header_length
                                || headers.len() > limits.max_header_number
                            {
                                return Err(ParseError::LengthExceeded);
                            }
                            self.field.clear();
                            self.state = BlockState::LineStart;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_line(input: &[u8]) -> FieldLine {
        let mut field = FieldLine::new();
        let limits = ParseLimits::default();
        let (progress, consumed) = field.parse(input, &limits).expect("line should parse");
        assert_eq!(progress, Progress::Complete);
        assert_eq!(consumed, input.len() - 1, "terminator lookahead byte stays");
        field
    }

    #[test]
    fn simple_field_line() {
        let field = parse_line(b"Host: example.com\r\nX");
        assert_eq!(field.name(), "host");
        assert_eq!(field.value(), b"example.com");
    }

    #[test]
    fn name_is_lowercased_value_case_preserved() {
        let field = parse_line(b"CONTENT-Type: Text/HTML\r\nX");
        assert_eq!(field.name(), "content-type");
        assert_eq!(field.value(), b"Text/HTML");
    }

    #[test]
    fn leading_whitespace_is_skipped() {
        let field = parse_line(b"a: \t  b\r\nX");
        assert_eq!(field.value(), b"b");
    }

    #[test]
    fn trailing_whitespace_is_kept() {
        let field = parse_line(b"a: b  \r\nX");
        assert_eq!(field.value(), b"b  ");
    }

    #[test]
    fn folded_continuation_joins_with_space() {
        let field = parse_line(b"X: a\r\n b\r\nZ");
        assert_eq!(field.name(), "x");
        assert_eq!(field.value(), b"a b");
    }

    #[test]
    fn folding_works_across_buffer_boundaries() {
        let limits = ParseLimits::default();
        let full = b"X: a\r\n b\r\nZ";
        for split in 0..full.len() {
            let mut field = FieldLine::new();
            let (first, second) = full.split_at(split);
            let (progress, used1) = field.parse(first, &limits).unwrap();
            let consumed = match progress {
                Progress::Complete => used1,
                Progress::Incomplete => {
                    assert_eq!(used1, first.len());
                    let (progress, used2) = field.parse(second, &limits).unwrap();
                    assert_eq!(progress, Progress::Complete, "split at {split}");
                    used1 + used2
                }
            };
            assert_eq!(consumed, full.len() - 1);
            assert_eq!(field.value(), b"a b", "split at {split}");
        }
    }

    #[test]
    fn bare_lf_accepted_when_lax() {
        let field = parse_line(b"a: b\nX");
        assert_eq!(field.value(), b"b");
    }

    #[test]
    fn bare_lf_rejected_when_strict() {
        let limits = ParseLimits::default().with_strict_crlf(true);
        let mut field = FieldLine::new();
        assert_eq!(
            field.parse(b"a: b\nX", &limits),
            Err(ParseError::StrictCrlfViolation)
        );
    }

    #[test]
    fn cr_without_lf_is_malformed() {
        let mut field = FieldLine::new();
        assert_eq!(
            field.parse(b"a: b\rX", &ParseLimits::default()),
            Err(ParseError::MalformedSyntax)
        );
    }

    #[test]
    fn invalid_name_byte_rejected() {
        for input in [&b"a b: c\r\n"[..], b"a\x00: c\r\n", b"a=1: c\r\n"] {
            let mut field = FieldLine::new();
            assert_eq!(
                field.parse(input, &ParseLimits::default()),
                Err(ParseError::MalformedSyntax),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn empty_name_rejected() {
        let mut field = FieldLine::new();
        assert_eq!(
            field.parse(b": v\r\n", &ParseLimits::default()),
            Err(ParseError::MalformedSyntax)
        );
    }

    #[test]
    fn line_length_limit_enforced() {
        let limits = ParseLimits::default().with_max_line_length(8);
        let mut field = FieldLine::new();
        assert_eq!(
            field.parse(b"abcdefgh: value\r\n", &limits),
            Err(ParseError::LengthExceeded)
        );
    }

    #[test]
    fn whitespace_limit_enforced() {
        let limits = ParseLimits::default().with_max_whitespace(2);
        let mut field = FieldLine::new();
        assert_eq!(
            field.parse(b"a:    b\r\n", &limits),
            Err(ParseError::LengthExceeded)
        );
    }

    #[test]
    fn clear_reuses_parser() {
        let limits = ParseLimits::default();
        let mut field = FieldLine::new();
        let (progress, _) = field.parse(b"a: 1\r\nX", &limits).unwrap();
        assert_eq!(progress, Progress::Complete);
        field.clear();
        let (progress, _) = field.parse(b"b: 2\r\nX", &limits).unwrap();
        assert_eq!(progress, Progress::Complete);
        assert_eq!(field.name(), "b");
        assert_eq!(field.value(), b"2");
    }

    fn decode_block(input: &[u8]) -> (Headers, usize) {
        let mut decoder = HeadersDecoder::new();
        let mut headers = Headers::new();
        let limits = ParseLimits::default();
        let (progress, consumed) = decoder
            .decode(input, &limits, &mut headers)
            .expect("block should parse");
        assert_eq!(progress, Progress::Complete);
        (headers, consumed)
    }

    #[test]
    fn header_block_to_blank_line() {
        let (headers, consumed) = decode_block(b"Host: x\r\nAccept: */*\r\n\r\nbody");
        assert_eq!(consumed, 24);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.find("host"), Some(&b"x"[..]));
        assert_eq!(headers.find("accept"), Some(&b"*/*"[..]));
    }

    #[test]
    fn empty_block_is_just_blank_line() {
        let (headers, consumed) = decode_block(b"\r\nrest");
        assert!(headers.is_empty());
        assert_eq!(consumed, 2);
    }

    #[test]
    fn lax_blank_line_is_single_lf() {
        let (headers, consumed) = decode_block(b"a: 1\n\nrest");
        assert_eq!(headers.find("a"), Some(&b"1"[..]));
        assert_eq!(consumed, 6);
    }

    #[test]
    fn strict_blank_line_requires_crlf() {
        let mut decoder = HeadersDecoder::new();
        let mut headers = Headers::new();
        let limits = ParseLimits::default().with_strict_crlf(true);
        assert_eq!(
            decoder.decode(b"a: 1\r\n\nrest", &limits, &mut headers),
            Err(ParseError::StrictCrlfViolation)
        );
    }

    #[test]
    fn duplicate_fields_merge_in_order() {
        let (headers, _) = decode_block(b"Accept: text/html\r\nAccept: text/plain\r\n\r\n");
        assert_eq!(
            headers.find("accept"),
            Some(&b"text/html, text/plain"[..])
        );
    }

    #[test]
    fn cookie_fields_merge_with_semicolon() {
        let (headers, _) = decode_block(b"Cookie: a=1\r\nCookie: b=2\r\n\r\n");
        assert_eq!(headers.find("cookie"), Some(&b"a=1; b=2"[..]));
    }

    #[test]
    fn header_count_limit_enforced() {
        let mut decoder = HeadersDecoder::new();
        let mut headers = Headers::new();
        let limits = ParseLimits::default().with_max_header_number(1);
        assert_eq!(
            decoder.decode(b"a: 1\r\nb: 2\r\n\r\n", &limits, &mut headers),
            Err(ParseError::LengthExceeded)
        );
    }

    #[test]
    fn cumulative_length_limit_enforced() {
        let mut decoder = HeadersDecoder::new();
        let mut headers = Headers::new();
        let limits = ParseLimits::default().with_max_header_length(8);
        assert_eq!(
            decoder.decode(b"abc: defg\r\nhij: klmn\r\n\r\n", &limits, &mut headers),
            Err(ParseError::LengthExceeded)
        );
    }

    #[test]
    fn block_decoding_is_split_independent() {
        let full = b"Host: x\r\nCookie: a=1\r\nCookie: b=2\r\n\r\n";
        let limits = ParseLimits::default();
        for split in 0..full.len() {
            let mut decoder = HeadersDecoder::new();
            let mut headers = Headers::new();
            let (first, second) = full.split_at(split);
            let (progress, used1) = decoder.decode(first, &limits, &mut headers).unwrap();
            if progress == Progress::Incomplete {
                let (progress, used2) = decoder.decode(second, &limits, &mut headers).unwrap();
                assert_eq!(progress, Progress::Complete, "split at {split}");
                assert_eq!(used1 + used2, full.len());
            }
            assert_eq!(headers.find("cookie"), Some(&b"a=1; b=2"[..]));
            assert_eq!(headers.find("host"), Some(&b"x"[..]));
        }
    }
}
