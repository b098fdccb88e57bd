//! Line framing over a byte stream.
//!
//! [`LineCodec`] splits a bounded receive buffer into protocol lines and
//! encodes outbound [`Message`]s with their CRLF terminator. Both halves are
//! plain methods so the sans-IO session can drive them directly; with the
//! `tokio` feature the same codec also implements `tokio_util`'s
//! `Decoder`/`Encoder`.

use bytes::{BufMut, BytesMut};
use tracing::warn;

use crate::message::Message;
use crate::util::{truncate_utf8_safe, MAX_LINE_CONTENT};

/// Size of the receive buffer a session keeps per connection.
pub const RECV_BUFFER_MAX: usize = 8 * 1024;

/// CRLF line codec.
#[derive(Clone, Debug)]
pub struct LineCodec {
    max_buffer: usize,
    /// Set after a terminator-less buffer overflowed; the rest of that line
    /// is dropped when its terminator arrives.
    discarding: bool,
}

impl Default for LineCodec {
    fn default() -> Self {
        LineCodec::new()
    }
}

impl LineCodec {
    /// A codec with the default 8 KiB receive bound.
    pub fn new() -> LineCodec {
        LineCodec::with_max_buffer(RECV_BUFFER_MAX)
    }

    /// A codec that discards buffered input once `max_buffer` bytes
    /// accumulate without a line terminator.
    pub fn with_max_buffer(max_buffer: usize) -> LineCodec {
        LineCodec {
            max_buffer,
            discarding: false,
        }
    }

    /// Forget any partial-line state, for a fresh connection.
    pub fn reset(&mut self) {
        self.discarding = false;
    }

    /// Bytes that may still be appended to `buf` before it is full.
    pub fn remaining_capacity(&self, buf: &BytesMut) -> usize {
        self.max_buffer.saturating_sub(buf.len())
    }

    /// Take the next complete line out of `buf`.
    ///
    /// Lines end in LF with an optional preceding CR. Blank lines are
    /// skipped, lines longer than the protocol allows are truncated, and
    /// invalid UTF-8 is replaced rather than rejected. Returns `None` once
    /// no complete line remains.
    pub fn decode_line(&mut self, buf: &mut BytesMut) -> Option<String> {
        loop {
            let Some(newline) = buf.iter().position(|&b| b == b'\n') else {
                if buf.len() >= self.max_buffer {
                    warn!(
                        buffered = buf.len(),
                        "receive buffer full without a line terminator, discarding"
                    );
                    buf.clear();
                    self.discarding = true;
                }
                return None;
            };

            let raw = buf.split_to(newline + 1);
            if std::mem::take(&mut self.discarding) {
                continue;
            }

            let mut content = &raw[..newline];
            if let [rest @ .., b'\r'] = content {
                content = rest;
            }
            if content.is_empty() {
                continue;
            }

            let text = String::from_utf8_lossy(content);
            if text.len() > MAX_LINE_CONTENT {
                warn!(length = text.len(), "inbound line too long, truncating");
            }
            return Some(truncate_utf8_safe(&text, MAX_LINE_CONTENT).to_owned());
        }
    }

    /// Append `msg` and its terminator to `dst`, returning the bytes written.
    ///
    /// Content past 510 bytes is cut on a character boundary; the dropped
    /// tail is not sent later.
    pub fn encode_message(&mut self, msg: &Message, dst: &mut BytesMut) -> usize {
        let line = msg.to_string();
        if line.len() > MAX_LINE_CONTENT {
            warn!(
                command = %msg.command,
                length = line.len(),
                "outbound message too long, truncating"
            );
        }
        let content = truncate_utf8_safe(&line, MAX_LINE_CONTENT);
        dst.reserve(content.len() + 2);
        dst.put_slice(content.as_bytes());
        dst.put_slice(b"\r\n");
        content.len() + 2
    }
}

#[cfg(feature = "tokio")]
mod codec {
    use bytes::BytesMut;
    use tokio_util::codec::{Decoder, Encoder};

    use super::LineCodec;
    use crate::error::ProtocolError;
    use crate::message::Message;

    impl Decoder for LineCodec {
        type Item = String;
        type Error = ProtocolError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
            Ok(self.decode_line(src))
        }
    }

    impl Encoder<Message> for LineCodec {
        type Error = ProtocolError;

        fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), ProtocolError> {
            self.encode_message(&msg, dst);
            Ok(())
        }
    }

    impl Encoder<&Message> for LineCodec {
        type Error = ProtocolError;

        fn encode(&mut self, msg: &Message, dst: &mut BytesMut) -> Result<(), ProtocolError> {
            self.encode_message(msg, dst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(s: &[u8]) -> BytesMut {
        BytesMut::from(s)
    }

    #[test]
    fn test_splits_crlf_and_lf() {
        let mut codec = LineCodec::new();
        let mut b = buf(b"PING :a\r\nPING :b\nPING :c");
        assert_eq!(codec.decode_line(&mut b).as_deref(), Some("PING :a"));
        assert_eq!(codec.decode_line(&mut b).as_deref(), Some("PING :b"));
        assert_eq!(codec.decode_line(&mut b), None);
        assert_eq!(&b[..], b"PING :c");

        b.extend_from_slice(b"\r\n");
        assert_eq!(codec.decode_line(&mut b).as_deref(), Some("PING :c"));
        assert!(b.is_empty());
    }

    #[test]
    fn test_skips_blank_lines() {
        let mut codec = LineCodec::new();
        let mut b = buf(b"\r\n\r\nPING :x\r\n");
        assert_eq!(codec.decode_line(&mut b).as_deref(), Some("PING :x"));
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut codec = LineCodec::new();
        let mut b = buf(b"PRIVMSG #c :caf\xe9\r\n");
        let line = codec.decode_line(&mut b).unwrap();
        assert!(line.starts_with("PRIVMSG #c :caf"));
        assert!(line.ends_with('\u{FFFD}'));
    }

    #[test]
    fn test_long_line_truncated() {
        let mut codec = LineCodec::new();
        let mut b = BytesMut::new();
        b.extend_from_slice(&[b'a'; 600]);
        b.extend_from_slice(b"\r\n");
        assert_eq!(codec.decode_line(&mut b).unwrap().len(), MAX_LINE_CONTENT);
    }

    #[test]
    fn test_overflow_discards_rest_of_line() {
        let mut codec = LineCodec::with_max_buffer(16);
        let mut b = BytesMut::new();
        b.extend_from_slice(&[b'x'; 16]);
        assert_eq!(codec.decode_line(&mut b), None);
        assert!(b.is_empty());
        assert_eq!(codec.remaining_capacity(&b), 16);

        b.extend_from_slice(b"tail\r\nPING :ok\r\n");
        assert_eq!(codec.decode_line(&mut b).as_deref(), Some("PING :ok"));
    }

    #[test]
    fn test_encode_appends_crlf() {
        let mut codec = LineCodec::new();
        let mut dst = BytesMut::new();
        let n = codec.encode_message(&Message::privmsg("#c", "hi"), &mut dst);
        assert_eq!(&dst[..], b"PRIVMSG #c :hi\r\n");
        assert_eq!(n, dst.len());
    }

    #[test]
    fn test_encode_truncates_to_wire_limit() {
        let mut codec = LineCodec::new();
        let mut dst = BytesMut::new();
        let text = "é".repeat(400);
        let n = codec.encode_message(&Message::privmsg("#c", &text), &mut dst);
        assert!(n <= 512);
        assert!(dst.ends_with(b"\r\n"));
        assert!(std::str::from_utf8(&dst).is_ok());
    }

    #[cfg(feature = "tokio")]
    #[test]
    fn test_tokio_codec() {
        use tokio_util::codec::{Decoder, Encoder};

        let mut codec = LineCodec::new();
        let mut b = buf(b":srv PING :tok\r\n");
        let line = Decoder::decode(&mut codec, &mut b).unwrap();
        assert_eq!(line.as_deref(), Some(":srv PING :tok"));

        let mut dst = BytesMut::new();
        Encoder::encode(&mut codec, Message::pong("tok"), &mut dst).unwrap();
        assert_eq!(&dst[..], b"PONG :tok\r\n");
    }
}
