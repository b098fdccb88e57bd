//! # slirc-session
//!
//! An embeddable IRC client session engine: one connection, one identity,
//! with the protocol bookkeeping a bot or client needs.
//!
//! ## Features
//!
//! - Line codec and message parsing/serialization (prefix, command, up to
//!   15 parameters, trailing text)
//! - ISUPPORT ingestion with `CHANMODES`/`PREFIX` driven mode classification
//! - Channel registry: rosters, per-user privileges, topics, list and
//!   value modes
//! - Token bucket flood control with a bounded outbound queue
//! - Liveness pings, idle ticks, nickname retry during registration
//! - A sans-IO [`Session`] plus an optional Tokio [`Client`] that connects,
//!   logs in and reconnects with backoff
//!
//! ## Quick Start
//!
//! ### Driving a session by hand
//!
//! ```rust
//! use std::time::Instant;
//! use slirc_session::{Event, Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::new("irc.example.org", 6667, "bot"));
//! let mut seen = Vec::new();
//! let mut handler = |_: &mut Session, event: &Event| seen.push(event.clone());
//!
//! session.connected(Instant::now());
//! session.receive(
//!     b":srv 001 bot :Welcome\r\n:bot!b@host JOIN #rust\r\n",
//!     Instant::now(),
//!     &mut handler,
//! );
//!
//! assert!(session.channel("#rust").is_some());
//! assert!(seen.contains(&Event::Connect));
//! ```
//!
//! ### Parsing IRC messages
//!
//! ```rust
//! use slirc_session::Message;
//!
//! let message: Message = ":nick!user@host PRIVMSG #channel :Hello!".parse().unwrap();
//! assert_eq!(message.source_nickname(), Some("nick"));
//! assert_eq!(message.arg(1), Some("Hello!"));
//! ```

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod casemap;
pub mod chan;
pub mod config;
pub mod error;
pub mod event;
pub mod flood;
pub mod isupport;
pub mod line;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod response;
pub mod session;
pub mod state;
pub mod util;

#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod client;
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod transport;

pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::chan::ChannelExt;
pub use self::config::{FloodConfig, ReconnectPolicy, SessionConfig};
pub use self::error::{ProtocolError, SessionError};
pub use self::event::{Event, Handler, Verdict};
pub use self::flood::{Admission, FloodControl, TokenBucket};
pub use self::isupport::{ChanModes, Isupport, ModeClass, PrefixSpec};
pub use self::line::LineCodec;
pub use self::message::Message;
pub use self::mode::{apply_mode_change, parse_mode_change, ModeApplication, ModeChange};
pub use self::prefix::PrefixRef;
pub use self::response::Response;
pub use self::session::{KillHandle, Session};
pub use self::state::{Channel, ConnectionState, ModeValue, Registry, User};

#[cfg(feature = "tokio")]
pub use self::client::Client;
#[cfg(feature = "tokio")]
pub use self::transport::Transport;
