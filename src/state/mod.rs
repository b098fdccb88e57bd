//! Channel, roster and mode state tracked for one connection.
//!
//! The [`Registry`] owns one [`Channel`] per joined channel. Channels are
//! created when we join, destroyed when we part, are kicked or disconnect.
//! Members are [`User`] records keyed by full prefix, each carrying the
//! privilege letters they hold in that channel only.
//!
//! Every mutation is synchronous and local. Naming a channel or user that
//! is not tracked produces a `warn` diagnostic and no change.
//!
//! # Example
//!
//! ```
//! use slirc_session::state::Registry;
//!
//! let mut registry = Registry::new();
//! registry.add_channel("#rust");
//! registry.add_user("#rust", "alice!a@example.org");
//!
//! let alice = registry.find_user("#RUST", "Alice").unwrap();
//! assert_eq!(alice.prefix(), "alice!a@example.org");
//! ```

mod channel;
mod registry;

pub use self::channel::{Channel, ModeValue, User};
pub use self::registry::Registry;

pub(crate) use self::channel::parse_unix_time;

/// Where a session is in its connection lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// No connection; the initial state and the state after a drop.
    #[default]
    Disconnected,
    /// Resolving and connecting.
    Connecting,
    /// Connected, registration sent, waiting for 001.
    LoggingIn,
    /// Registered with the server.
    Active,
}

impl ConnectionState {
    /// Whether a transport is currently up.
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::LoggingIn | ConnectionState::Active)
    }
}
