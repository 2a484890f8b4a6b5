//! Blank-line event framing.

use super::decoder::Utf8StreamDecoder;

/// Event separator on the analysis stream.
pub const EVENT_SEPARATOR: &str = "\n\n";

/// Splits decoded text into complete event segments.
///
/// Everything after the last separator stays buffered until a later chunk
/// completes it. Segment boundaries never depend on how the transport
/// chunked the bytes.
#[derive(Debug, Default, Clone)]
pub struct EventFramer {
    decoder: Utf8StreamDecoder,
    buffer: String,
}

impl EventFramer {
    /// Create an empty framer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            decoder: Utf8StreamDecoder::new(),
            buffer: String::new(),
        }
    }

    /// Feed a chunk and return the segments it completes, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decoder.decode(chunk);
        self.buffer.push_str(&text);

        let mut segments = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].find(EVENT_SEPARATOR) {
            let end = start + offset;
            segments.push(self.buffer[start..end].to_string());
            start = end + EVENT_SEPARATOR.len();
        }
        self.buffer.drain(..start);
        segments
    }

    /// Bytes of text buffered without a terminating separator.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// End of stream. Returns the unterminated remainder, if any.
    ///
    /// The remainder is never dispatched as an event.
    #[must_use]
    pub fn finish(self) -> Option<String> {
        let mut rest = self.buffer;
        rest.push_str(&self.decoder.finish());
        (!rest.trim().is_empty()).then_some(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_segments_and_retains_remainder() {
        let mut framer = EventFramer::new();
        let segments = framer.push(b"data: a\n\ndata: b\n\ndata: c");
        assert_eq!(segments, vec!["data: a", "data: b"]);
        assert_eq!(framer.buffered_len(), "data: c".len());
        assert_eq!(framer.finish().as_deref(), Some("data: c"));
    }

    #[test]
    fn separator_split_across_chunks() {
        let mut framer = EventFramer::new();
        assert!(framer.push(b"data: a\n").is_empty());
        assert_eq!(framer.push(b"\ndata: b"), vec!["data: a"]);
    }

    #[test]
    fn consecutive_separators_yield_empty_segments() {
        let mut framer = EventFramer::new();
        assert_eq!(framer.push(b"data: a\n\n\n\n"), vec!["data: a", ""]);
        assert_eq!(framer.finish(), None);
    }
}
