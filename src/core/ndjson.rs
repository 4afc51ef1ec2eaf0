//! Newline-delimited JSON framing shared by the chat and pull streams.
//!
//! Transport chunks can split a line anywhere, including inside a multi-byte
//! character, so bytes are buffered until a `\n` arrives and only complete
//! lines are decoded. The trailing unterminated line is flushed when the
//! transport signals end-of-stream.

use memchr::memchr;
use serde::de::DeserializeOwned;
use tracing::warn;

#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer `chunk` and return every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = memchr(b'\n', &self.buffer[start..]) {
            let end = start + offset;
            if let Some(line) = decode_text(&self.buffer[start..end]) {
                lines.push(line);
            }
            start = end + 1;
        }
        self.buffer.drain(..start);
        lines
    }

    /// Flush whatever is left once the transport has finished.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        decode_text(&rest)
    }
}

fn decode_text(bytes: &[u8]) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Err(err) => {
            warn!(error = %err, "skipping stream line with invalid UTF-8");
            None
        }
    }
}

/// Parse one line, logging and discarding it when it is not valid JSON for `T`.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Option<T> {
    match serde_json::from_str(line) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, line, "skipping malformed stream line");
            None
        }
    }
}
