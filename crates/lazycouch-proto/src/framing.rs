//! Newline-delimited JSON framing for the continuous changes feed.
//!
//! The server writes one JSON object per line and may interleave blank
//! heartbeat lines. Chunks arrive with arbitrary boundaries, so the decoder
//! buffers partial lines until their terminating `\n` shows up. A line still
//! buffered when the stream ends is returned by [`LineDecoder::finish`].

use bytes::{Bytes, BytesMut};

/// Line delimiter.
pub const DELIMITER: u8 = b'\n';

/// Incremental line splitter.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: BytesMut,
}

impl LineDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every line it completes.
    ///
    /// Returned lines exclude the delimiter. Blank lines are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == DELIMITER) {
            let mut line = self.buf.split_to(pos + 1);
            line.truncate(pos);
            if !is_blank(&line) {
                lines.push(line.freeze());
            }
        }
        lines
    }

    /// Signal end of stream, returning the trailing unterminated line if it is
    /// not blank.
    pub fn finish(&mut self) -> Option<Bytes> {
        let rest = self.buf.split();
        if is_blank(&rest) {
            None
        } else {
            Some(rest.freeze())
        }
    }

    /// Number of bytes buffered for the current partial line.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}
