//! Incremental JSON value framer.
//!
//! Upstream fragments arrive at arbitrary byte boundaries, frequently in the
//! middle of an object, so line-based JSON parsing is not an option. The
//! framer scans an append-only buffer byte by byte, tracking nesting depth and
//! string/escape state, and cuts out each complete top-level object or array.
//! Bytes between values (whitespace, stray text) are skipped.
//!
//! Scan state survives across [`JsonFramer::append`] calls, so each byte is
//! examined exactly once no matter how the input is chunked.

use std::fmt::{Display, Formatter};

/// Default cap for the in-progress buffer.
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 2_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramerError {
    /// The partial value being assembled grew past the configured cap.
    BufferExceededLimit { limit: usize },
}

impl Display for FramerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BufferExceededLimit { limit } => {
                write!(f, "JSON framer buffer exceeded {} bytes", limit)
            }
        }
    }
}

impl std::error::Error for FramerError {}

#[derive(Debug)]
pub struct JsonFramer {
    buffer: Vec<u8>,
    max_buffer_bytes: usize,
    /// Next buffer index to examine.
    scan_pos: usize,
    /// Start of the value currently being assembled, if any.
    start: Option<usize>,
    depth: usize,
    in_string: bool,
    escaping: bool,
}

impl Default for JsonFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER_BYTES)
    }
}

impl JsonFramer {
    pub fn new(max_buffer_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_buffer_bytes,
            scan_pos: 0,
            start: None,
            depth: 0,
            in_string: false,
            escaping: false,
        }
    }

    /// Append text and return every value completed by it, in order.
    ///
    /// Fails with [`FramerError::BufferExceededLimit`] (after clearing all
    /// state) when the remaining partial value exceeds the cap.
    pub fn append(&mut self, text: &str) -> Result<Vec<String>, FramerError> {
        self.buffer.extend_from_slice(text.as_bytes());
        let frames = self.scan();

        if self.buffer.len() > self.max_buffer_bytes {
            self.reset();
            return Err(FramerError::BufferExceededLimit {
                limit: self.max_buffer_bytes,
            });
        }

        Ok(frames)
    }

    /// Return leftover non-whitespace bytes (a truncated trailing value) and clear.
    pub fn finish(&mut self) -> Option<String> {
        let trailing = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.reset();
        if trailing.is_empty() {
            None
        } else {
            Some(trailing)
        }
    }

    /// Bytes currently held (only ever an in-progress partial value).
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    fn scan(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        let mut consumed = 0;

        for index in self.scan_pos..self.buffer.len() {
            let byte = self.buffer[index];

            let Some(start) = self.start else {
                if byte == b'{' || byte == b'[' {
                    self.start = Some(index);
                    self.depth = 1;
                    self.in_string = false;
                    self.escaping = false;
                } else {
                    consumed = index + 1;
                }
                continue;
            };

            if self.in_string {
                if self.escaping {
                    self.escaping = false;
                } else if byte == b'\\' {
                    self.escaping = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match byte {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        // Structural bytes are ASCII, so the cut is on a char boundary.
                        let frame = &self.buffer[start..=index];
                        frames.push(String::from_utf8_lossy(frame).into_owned());
                        self.start = None;
                        consumed = index + 1;
                    }
                }
                _ => {}
            }
        }

        self.buffer.drain(..consumed);
        self.scan_pos = self.buffer.len();
        self.start = self.start.map(|start| start - consumed);
        frames
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.scan_pos = 0;
        self.start = None;
        self.depth = 0;
        self.in_string = false;
        self.escaping = false;
    }
}

#[cfg(test)]
#[path = "tests/framer_tests.rs"]
mod tests;
