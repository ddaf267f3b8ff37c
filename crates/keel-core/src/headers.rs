//! HTTP headers collection.
//!
//! [`Headers`] stores fields in arrival order with lowercase names. Repeated
//! field names are merged into a single entry on insertion, joining values
//! with `", "` — or `"; "` for `cookie`, which is a semicolon-separated list
//! on the wire. Iteration and [`Display`] emission are deterministic
//! (insertion order).
//!
//! Values are kept as raw octets: HTTP header values are not guaranteed to
//! be UTF-8.
//!
//! [`Display`]: std::fmt::Display

use std::fmt;

/// An ordered HTTP headers collection with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, Vec<u8>)>,
}

impl Headers {
    /// Create empty headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty headers with space for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Remove every entry, keeping the outer allocation for reuse.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Add a header, merging into an existing entry of the same name.
    ///
    /// The name is lowercased for storage. A repeated name appends
    /// `"; value"` for `cookie` and `", value"` for everything else, in
    /// arrival order.
    pub fn add(&mut self, name: &str, value: &[u8]) {
        let name = name.to_ascii_lowercase();
        if let Some((_, existing)) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            let separator: &[u8] = if name == "cookie" { b"; " } else { b", " };
            existing.extend_from_slice(separator);
            existing.extend_from_slice(value);
        } else {
            self.fields.push((name, value.to_vec()));
        }
    }

    /// Insert a header, replacing any existing entry of the same name.
    pub fn set(&mut self, name: &str, value: &[u8]) {
        let name = name.to_ascii_lowercase();
        if let Some((_, existing)) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            existing.clear();
            existing.extend_from_slice(value);
        } else {
            self.fields.push((name, value.to_vec()));
        }
    }

    /// Remove a header by name (case-insensitive).
    ///
    /// Returns the removed value, if any.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        let name = name.to_ascii_lowercase();
        let index = self.fields.iter().position(|(n, _)| *n == name)?;
        Some(self.fields.remove(index).1)
    }

    /// Find a header value by name (case-insensitive input).
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&[u8]> {
        let name = name.to_ascii_lowercase();
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Check if a header exists (case-insensitive).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Iterate over all headers as `(name, value)` pairs in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_slice()))
    }

    /// The value of the `content-length` field.
    ///
    /// Returns `0` when the field is absent and `-1` when it is present but
    /// not a valid non-negative integer — including merged duplicates with
    /// different values, which become `"a, b"` and fail to parse.
    #[must_use]
    pub fn content_length(&self) -> i64 {
        let Some(value) = self.find("content-length") else {
            return 0;
        };
        let trimmed = trim_ws(value);
        if trimmed.is_empty() || !trimmed.iter().all(u8::is_ascii_digit) {
            return -1;
        }
        match std::str::from_utf8(trimmed).ok().and_then(|s| s.parse().ok()) {
            Some(n) => n,
            None => -1,
        }
    }

    /// Whether chunked transfer coding is applied to the message.
    ///
    /// True iff a `transfer-encoding` field is present and its value does
    /// not contain `"identity"`. This is the legacy RFC 2616 §4.4 reading
    /// kept for compatibility; receivers apply the stricter RFC 7230 check
    /// on the coding list before framing a body.
    #[must_use]
    pub fn is_chunked(&self) -> bool {
        match self.find("transfer-encoding") {
            Some(value) => !contains_ignore_case(value, b"identity"),
            None => false,
        }
    }

    /// Whether the connection should be closed after this message.
    #[must_use]
    pub fn close_connection(&self) -> bool {
        match self.find("connection") {
            Some(value) => contains_ignore_case(value, b"close"),
            None => false,
        }
    }

    /// Whether the client expects a `100 Continue` interim response.
    #[must_use]
    pub fn expect_continue(&self) -> bool {
        match self.find("expect") {
            Some(value) => contains_ignore_case(value, b"100-continue"),
            None => false,
        }
    }

    /// Write the headers as wire octets: `name: value\r\n` per field.
    ///
    /// The output is not terminated with an extra blank line, so it never
    /// trips [`are_headers_split`].
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        for (name, value) in &self.fields {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value);
            buf.extend_from_slice(b"\r\n");
        }
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            write!(f, "{name}: {}\r\n", String::from_utf8_lossy(value))?;
        }
        Ok(())
    }
}

/// Check whether a header string contains an embedded blank line.
///
/// A blank line (`\n\n` or `\n\r\n`) inside user-supplied header text would
/// terminate the header block early and let the remainder be parsed as a
/// separate message — the classic response-splitting injection. Builders
/// reject any value for which this returns true.
#[must_use]
pub fn are_headers_split(text: &[u8]) -> bool {
    let mut prev = 0u8;
    let mut pprev = 0u8;
    for &b in text {
        if b == b'\n' {
            if prev == b'\n' {
                return true;
            }
            if prev == b'\r' && pprev == b'\n' {
                return true;
            }
        }
        pprev = prev;
        prev = b;
    }
    false
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

fn contains_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}
