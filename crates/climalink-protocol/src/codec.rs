//! Newline framing for the serial byte stream.
//!
//! [`LineCodec`] plugs into tokio-util's `FramedRead`/`FramedWrite` and yields
//! one `String` per `\n`-terminated line.
//!
//! # Error Handling
//!
//! A `Framed` stream terminates after the first decoder error, which would
//! turn a single noisy line into a lost link. The decoder therefore never
//! fails on content:
//!
//! - Lines longer than the configured maximum are dropped up to and including
//!   their terminator, and counted.
//! - Invalid UTF-8 is replaced lossily; the JSON layer rejects the line.
//! - A trailing `\r` is stripped and blank lines are skipped.
//!
//! Only I/O errors from the underlying stream end it.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//! use climalink_protocol::LineCodec;
//!
//! let mut codec = LineCodec::new();
//! let mut buf = BytesMut::from(&b"{\"msg_type\":0}\r\n{\"msg"[..]);
//!
//! assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("{\"msg_type\":0}"));
//! assert_eq!(codec.decode(&mut buf).unwrap(), None);
//! ```

use std::{cmp, io};

use bytes::{Buf, BufMut, BytesMut};
use climalink_core::constants::{FRAME_DELIMITER, MAX_LINE_LENGTH};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Line splitter with an upper bound on line length.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Index of the next byte to scan for a terminator.
    next_index: usize,

    /// Longest accepted line, terminator excluded.
    max_length: usize,

    /// Set while skipping the rest of an oversized line.
    discarding: bool,

    /// Oversized lines dropped so far.
    discarded: u64,
}

impl LineCodec {
    /// Create a codec with the default maximum line length.
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom maximum line length.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
            discarding: false,
            discarded: 0,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Number of oversized lines dropped.
    pub fn discarded_lines(&self) -> u64 {
        self.discarded
    }

    fn finish_discard(&mut self) {
        self.discarding = false;
        self.discarded += 1;
        warn!(
            max_length = self.max_length,
            "Dropped line exceeding maximum length"
        );
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_line(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(String::from_utf8_lossy(line).into_owned())
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        loop {
            let read_to = cmp::min(self.max_length.saturating_add(1), buf.len());
            let newline = buf[self.next_index..read_to]
                .iter()
                .position(|b| *b == FRAME_DELIMITER);

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    buf.advance(offset + self.next_index + 1);
                    self.next_index = 0;
                    self.finish_discard();
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let newline_index = offset + self.next_index;
                    self.next_index = 0;
                    let line = buf.split_to(newline_index + 1);
                    if let Some(line) = strip_line(&line[..line.len() - 1]) {
                        return Ok(Some(line));
                    }
                }
                (false, None) if buf.len() > self.max_length => {
                    self.discarding = true;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }

        if buf.is_empty() {
            return Ok(None);
        }

        self.next_index = 0;
        let rest = buf.split_to(buf.len());
        if self.discarding {
            self.finish_discard();
            return Ok(None);
        }
        Ok(strip_line(&rest))
    }
}

impl<T> Encoder<T> for LineCodec
where
    T: AsRef<str>,
{
    type Error = io::Error;

    fn encode(&mut self, line: T, buf: &mut BytesMut) -> Result<(), io::Error> {
        let line = line.as_ref();
        if line.as_bytes().contains(&FRAME_DELIMITER) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "line contains a frame delimiter",
            ));
        }
        buf.reserve(line.len() + 1);
        buf.put(line.as_bytes());
        buf.put_u8(FRAME_DELIMITER);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut LineCodec, buf: &mut BytesMut) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = codec.decode(buf).unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_codec_new() {
        let codec = LineCodec::new();
        assert_eq!(codec.max_length(), MAX_LINE_LENGTH);
        assert_eq!(codec.discarded_lines(), 0);
    }

    #[test]
    fn test_decode_partial_line_waits() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"{\"msg_type\":0,"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"\"led\":true}\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap().as_deref(),
            Some("{\"msg_type\":0,\"led\":true}")
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_multiple_lines_in_buffer() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"one\ntwo\r\nthree\n"[..]);

        assert_eq!(decode_all(&mut codec, &mut buf), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_decode_skips_blank_lines() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"\n\r\n   \nvalue\n"[..]);

        assert_eq!(decode_all(&mut codec, &mut buf), vec!["value"]);
    }

    #[test]
    fn test_oversized_line_is_dropped_without_losing_next() {
        let mut codec = LineCodec::with_max_length(8);
        let mut buf = BytesMut::from(&b"0123456789abcdef\nok\n"[..]);

        assert_eq!(decode_all(&mut codec, &mut buf), vec!["ok"]);
        assert_eq!(codec.discarded_lines(), 1);
    }

    #[test]
    fn test_oversized_line_split_across_reads() {
        let mut codec = LineCodec::with_max_length(4);
        let mut buf = BytesMut::from(&b"aaaaaaa"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"aaaaaaaa");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"aa\nfine\n");

        assert_eq!(decode_all(&mut codec, &mut buf), vec!["fine"]);
        assert_eq!(codec.discarded_lines(), 1);
    }

    #[test]
    fn test_line_at_exact_limit_is_kept() {
        let mut codec = LineCodec::with_max_length(4);
        let mut buf = BytesMut::from(&b"abcd\n"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("abcd"));
        assert_eq!(codec.discarded_lines(), 0);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"a\xffb\n"[..]);

        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(line, "a\u{fffd}b");
    }

    #[test]
    fn test_decode_eof_returns_unterminated_tail() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"first\nlast"[..]);

        assert_eq!(codec.decode_eof(&mut buf).unwrap().as_deref(), Some("first"));
        assert_eq!(codec.decode_eof(&mut buf).unwrap().as_deref(), Some("last"));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_encode_appends_delimiter() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();

        codec
            .encode(r#"{"msg_type":1,"led":true,"fan":false}"#, &mut buf)
            .unwrap();

        assert_eq!(&buf[..], b"{\"msg_type\":1,\"led\":true,\"fan\":false}\n");
    }

    #[test]
    fn test_encode_rejects_embedded_newline() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();

        let err = codec.encode("a\nb", &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(buf.is_empty());
    }
}
