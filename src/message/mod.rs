//! IRC message type, line parser and serializer.
//!
//! A [`Message`] is the owned form of one protocol line:
//!
//! ```text
//! [@tags] [:prefix] <command> [params...] [:trailing]
//! ```
//!
//! Parsing goes through [`str::parse`]; serialization through
//! [`Display`](std::fmt::Display), which never appends the CRLF terminator.
//! Framing and the 512-byte wire limit belong to [`LineCodec`](crate::line::LineCodec).

mod builders;
mod parse;
mod serialize;
mod types;

pub use self::types::Message;
