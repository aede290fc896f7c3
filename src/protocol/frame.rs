//! Line framing for the serial link.
//!
//! The device side speaks newline-terminated text in both directions:
//! ```text
//! ┌──────────────────────────┬──────┐
//! │  UTF-8 text (no '\n')    │ '\n' │
//! └──────────────────────────┴──────┘
//! ```
//! A trailing `'\r'` before the delimiter is dropped, so CRLF devices work too.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::LineError;

/// Line delimiter byte.
pub const LINE_DELIMITER: u8 = b'\n';

/// Maximum length of a single line, delimiter excluded.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Encodes a token as one newline-terminated line.
#[must_use]
pub fn encode(line: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(line.len() + 1);
    buf.put_slice(line.as_bytes());
    buf.put_u8(LINE_DELIMITER);
    buf.freeze()
}

/// Line decoder that handles partial data.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
    /// Dropping the tail of an overlong line up to its delimiter.
    discarding: bool,
}

impl LineDecoder {
    /// Creates a new line decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            discarding: false,
        }
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next complete line.
    ///
    /// Returns `Ok(Some(line))` if a complete line was decoded, `Ok(None)` if
    /// more data is needed. Invalid UTF-8 is replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns `LineError::TooLong` if a line exceeds [`MAX_LINE_LENGTH`].
    /// The whole line is discarded up to its delimiter, so decoding resumes
    /// with the next line.
    pub fn decode(&mut self) -> Result<Option<String>, LineError> {
        if self.discarding {
            let Some(pos) = self.buffer.iter().position(|&b| b == LINE_DELIMITER) else {
                self.buffer.clear();
                return Ok(None);
            };
            self.buffer.advance(pos + 1);
            self.discarding = false;
        }

        let Some(pos) = self.buffer.iter().position(|&b| b == LINE_DELIMITER) else {
            if self.buffer.len() > MAX_LINE_LENGTH {
                let size = self.buffer.len();
                self.buffer.clear();
                self.discarding = true;
                return Err(LineError::TooLong {
                    size,
                    max: MAX_LINE_LENGTH,
                });
            }
            return Ok(None);
        };

        let mut line = self.buffer.split_to(pos);
        self.buffer.advance(1); // Skip delimiter

        if line.len() > MAX_LINE_LENGTH {
            return Err(LineError::TooLong {
                size: line.len(),
                max: MAX_LINE_LENGTH,
            });
        }

        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }

        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
