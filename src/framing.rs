//! Line framing for the device console.
//!
//! The firmware prints newline-delimited text, sometimes with `\r\n` endings.
//! [`LineFramer`] accumulates raw bytes and hands back complete lines. Decoding
//! happens per complete line, after the bytes have been reassembled, so a
//! multi-byte character split across two reads survives and the emitted lines
//! never depend on how the transport chunked the stream.

use memchr::{memchr, memchr_iter, memrchr};

/// Accumulates raw console bytes and splits them into lines.
#[derive(Debug, Default, Clone)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every line that is now complete.
    ///
    /// Bytes after the last `\n` stay buffered.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let Some(last) = memrchr(b'\n', &self.buffer) else {
            return Vec::new();
        };

        let lines = split_terminated(&self.buffer[..=last]);
        self.buffer.drain(..=last);
        lines
    }

    /// Append `bytes` without splitting; pair with [`LineFramer::next_line`].
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pop the oldest complete line, if any.
    pub fn next_line(&mut self) -> Option<String> {
        let end = memchr(b'\n', &self.buffer)?;
        let line = decode_line(&self.buffer[..end]);
        self.buffer.drain(..=end);
        Some(line)
    }

    /// Flush the buffer, including an unterminated tail.
    ///
    /// Empty lines are skipped here: this is used for the final sweep after a
    /// summary marker, where only content matters.
    pub fn take_remainder(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buffer);
        rest.split(|&b| b == b'\n')
            .map(decode_line)
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Number of bytes buffered without a terminator yet.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Split a byte stream in one go: complete lines plus the unterminated tail.
///
/// Feeding the same bytes through [`LineFramer::push`] in any chunking yields
/// the same lines and leaves the same tail buffered.
pub fn frame_lines(bytes: &[u8]) -> (Vec<String>, Vec<u8>) {
    match memrchr(b'\n', bytes) {
        Some(last) => (split_terminated(&bytes[..=last]), bytes[last + 1..].to_vec()),
        None => (Vec::new(), bytes.to_vec()),
    }
}

/// Decode bytes as UTF-8, dropping invalid sequences instead of replacing them.
pub fn decode_lossy(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    out.push_str(valid);
                }
                match e.error_len() {
                    Some(len) => bytes = &rest[len..],
                    // Truncated sequence at the end of the line.
                    None => return out,
                }
            }
        }
    }
}

// `chunk` must end with '\n'.
fn split_terminated(chunk: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;
    for end in memchr_iter(b'\n', chunk) {
        lines.push(decode_line(&chunk[start..end]));
        start = end + 1;
    }
    lines
}

fn decode_line(raw: &[u8]) -> String {
    let mut line = decode_lossy(raw);
    let trimmed = line.trim_end_matches('\r').len();
    line.truncate(trimmed);
    line
}
