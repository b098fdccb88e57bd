//! Error types for the IRC session engine.
//!
//! This module defines error types for protocol-level errors,
//! message parsing failures, mode application, capability lookups
//! and connection-level failures.

use std::time::Duration;

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The raw message string.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors encountered when parsing IRC messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// A `:prefix` was not followed by a space.
    #[error("prefix is not terminated by a space")]
    UnterminatedPrefix,

    /// Command was invalid or missing.
    #[error("missing or invalid command")]
    InvalidCommand,

    /// More middle parameters than the protocol allows.
    #[error("too many parameters: {0}")]
    TooManyParams(usize),

    /// Not enough arguments for command.
    #[error("{command}: expected at least {expected} arguments, got {got}")]
    NotEnoughArguments {
        /// The command or numeric being handled.
        command: String,
        /// Expected number of arguments.
        expected: usize,
        /// Actual number of arguments.
        got: usize,
    },
}

/// Errors encountered while applying a channel mode change.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModeError {
    /// A mode letter needed a positional argument but the pool was empty.
    #[error("too few mode parameters: '{sign}{mode}' needs an argument")]
    MissingArgument {
        /// `+` or `-`.
        sign: char,
        /// The mode letter that ran out of arguments.
        mode: char,
    },

    /// The mode change targets a channel we are not tracking.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}

/// Errors encountered when reading structured ISUPPORT values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CapabilityError {
    /// The server never advertised the capability.
    #[error("capability {0} not advertised")]
    Missing(&'static str),

    /// The capability was advertised with an unusable value.
    #[error("capability {key} has malformed value {value:?}")]
    Malformed {
        /// Capability name.
        key: &'static str,
        /// The raw advertised value.
        value: String,
    },
}

/// Connection-level failures surfaced by the session engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Host name resolution failed.
    #[error("unable to look up {host}: {source}")]
    Resolve {
        /// The host being resolved.
        host: String,
        /// The resolver error.
        #[source]
        source: std::io::Error,
    },

    /// Every resolved address refused or failed the connection.
    #[error("unable to connect to any address of {host}:{port}")]
    Unreachable {
        /// The configured host.
        host: String,
        /// The configured port.
        port: u16,
    },

    /// A connect attempt did not finish in time.
    #[error("connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// I/O error on an established connection.
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    /// The server stayed silent after a liveness ping.
    #[error("no reply from server for {0:?}")]
    PingTimeout(Duration),

    /// The reconnect policy gave up.
    #[error("giving up after {0} failed connection attempts")]
    ReconnectExhausted(u32),
}
