//! Line framing for controller output
//!
//! Accumulates raw bytes and hands back complete, trimmed text lines. Bytes
//! that are not valid UTF-8 are replaced, never rejected: one corrupted byte on
//! the wire must not end a session.

use super::Transport;
use std::collections::VecDeque;
use std::io;

/// Longest partial line kept while waiting for its terminator
pub const MAX_PENDING_BYTES: usize = 4096;

const READ_CHUNK: usize = 256;

/// Incremental line decoder
#[derive(Debug, Default)]
pub struct LineReader {
    pending: Vec<u8>,
    lines: VecDeque<String>,
}

impl LineReader {
    /// Create an empty reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes; any completed lines become available to [`next_line`].
    ///
    /// [`next_line`]: LineReader::next_line
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' {
                let raw = std::mem::take(&mut self.pending);
                self.lines
                    .push_back(String::from_utf8_lossy(&raw).trim().to_string());
            } else {
                self.pending.push(byte);
            }
        }

        if self.pending.len() > MAX_PENDING_BYTES {
            tracing::warn!(
                "Discarding {} bytes of unterminated controller output",
                self.pending.len()
            );
            self.pending.clear();
        }
    }

    /// Pull everything the transport currently has buffered.
    ///
    /// Returns the number of bytes read; zero is the normal idle case.
    pub fn fill_from(&mut self, transport: &mut dyn Transport) -> io::Result<usize> {
        let mut buf = [0u8; READ_CHUNK];
        let mut total = 0;
        loop {
            let n = transport.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.feed(&buf[..n]);
            total += n;
        }
        Ok(total)
    }

    /// Next complete line, if one is buffered
    pub fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    /// Whether a complete line is ready
    pub fn has_line(&self) -> bool {
        !self.lines.is_empty()
    }

    /// Bytes of an unterminated trailing line
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop all complete lines and any partial line. Returns the number of
    /// complete lines discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.lines.len();
        self.lines.clear();
        self.pending.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::MockTransport;
    use proptest::prelude::*;

    #[test]
    fn test_partial_line_is_held() {
        let mut reader = LineReader::new();
        reader.feed(b"<Idle|MPos:0.000");
        assert_eq!(reader.next_line(), None);
        assert_eq!(reader.pending_len(), 16);

        reader.feed(b",0.000,0.000>\r\nok\n");
        assert_eq!(
            reader.next_line().as_deref(),
            Some("<Idle|MPos:0.000,0.000,0.000>")
        );
        assert_eq!(reader.next_line().as_deref(), Some("ok"));
        assert_eq!(reader.next_line(), None);
        assert_eq!(reader.pending_len(), 0);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut reader = LineReader::new();
        reader.feed(b"Grbl 3.7 [FluidNC v3.7.8\xff\xfe]\nok\n");
        let line = reader.next_line().unwrap();
        assert!(line.starts_with("Grbl 3.7 [FluidNC v3.7.8"));
        assert!(line.contains('\u{FFFD}'));
        assert_eq!(reader.next_line().as_deref(), Some("ok"));
    }

    #[test]
    fn test_good_lines_survive_around_garbage() {
        let mut reader = LineReader::new();
        reader.feed(b"ok\n\x80\x81\x82\n[MSG:INFO: ready]\n");
        assert_eq!(reader.next_line().as_deref(), Some("ok"));
        assert_eq!(reader.next_line().as_deref(), Some("\u{FFFD}\u{FFFD}\u{FFFD}"));
        assert_eq!(reader.next_line().as_deref(), Some("[MSG:INFO: ready]"));
    }

    #[test]
    fn test_runaway_partial_line_discarded() {
        let mut reader = LineReader::new();
        reader.feed(&vec![b'x'; MAX_PENDING_BYTES + 1]);
        assert_eq!(reader.pending_len(), 0);
        reader.feed(b"ok\n");
        assert_eq!(reader.next_line().as_deref(), Some("ok"));
    }

    #[test]
    fn test_clear() {
        let mut reader = LineReader::new();
        reader.feed(b"one\ntwo\nthr");
        assert_eq!(reader.clear(), 2);
        assert!(!reader.has_line());
        assert_eq!(reader.pending_len(), 0);
    }

    #[test]
    fn test_fill_from_transport() {
        let (mut transport, handle) = MockTransport::new("mock");
        handle.push_inbound(b"[MSG:INFO: FluidNC v3.7.8]\nok\n");

        let mut reader = LineReader::new();
        assert_eq!(reader.fill_from(&mut transport).unwrap(), 30);
        assert_eq!(
            reader.next_line().as_deref(),
            Some("[MSG:INFO: FluidNC v3.7.8]")
        );
        assert_eq!(reader.next_line().as_deref(), Some("ok"));
        assert_eq!(reader.fill_from(&mut transport).unwrap(), 0);
    }

    proptest! {
        #[test]
        fn prop_arbitrary_bytes_never_fail(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut reader = LineReader::new();
            reader.feed(&bytes);
            let newlines = bytes.iter().filter(|&&b| b == b'\n').count();
            let mut lines = 0;
            while let Some(line) = reader.next_line() {
                prop_assert!(!line.ends_with('\n'));
                lines += 1;
            }
            prop_assert_eq!(lines, newlines);
        }
    }
}
