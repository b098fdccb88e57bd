//! IRC message prefix (source) helpers.
//!
//! The registry keys users by their full `nick!user@host` prefix, but most
//! protocol traffic names a user by nickname alone. These helpers bridge the
//! two: [`same_nick`] compares only the nickname part, and
//! [`PrefixRef::parse`] splits a prefix into its components.

use crate::casemap::irc_eq;

/// A borrowed, split message prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefixRef<'a> {
    /// A server name such as `irc.example.org`.
    Server(&'a str),
    /// A user prefix: `nick[!user][@host]`.
    User {
        /// Nickname.
        nick: &'a str,
        /// Username (ident), if present.
        user: Option<&'a str>,
        /// Hostname, if present.
        host: Option<&'a str>,
    },
}

impl<'a> PrefixRef<'a> {
    /// Split a raw prefix (without the leading `:`).
    ///
    /// A prefix containing neither `!` nor `@` but containing a `.` is taken
    /// to be a server name.
    pub fn parse(raw: &'a str) -> Self {
        let (front, host) = match raw.split_once('@') {
            Some((front, host)) => (front, Some(host)),
            None => (raw, None),
        };
        let (nick, user) = match front.split_once('!') {
            Some((nick, user)) => (nick, Some(user)),
            None => (front, None),
        };

        if user.is_none() && host.is_none() && nick.contains('.') {
            PrefixRef::Server(raw)
        } else {
            PrefixRef::User { nick, user, host }
        }
    }

    /// The nickname, for user prefixes.
    pub fn nick(&self) -> Option<&'a str> {
        match *self {
            PrefixRef::User { nick, .. } => Some(nick),
            PrefixRef::Server(_) => None,
        }
    }

    /// The username, for user prefixes that carry one.
    pub fn user(&self) -> Option<&'a str> {
        match *self {
            PrefixRef::User { user, .. } => user,
            PrefixRef::Server(_) => None,
        }
    }

    /// The host part; for server prefixes this is the server name itself.
    pub fn host(&self) -> Option<&'a str> {
        match *self {
            PrefixRef::User { host, .. } => host,
            PrefixRef::Server(name) => Some(name),
        }
    }
}

/// Everything before the first `!` of a prefix (the whole string if none).
pub fn nick_of(prefix: &str) -> &str {
    prefix.split_once('!').map_or(prefix, |(nick, _)| nick)
}

/// Compare two nicknames or prefixes by nickname only, case-insensitively.
///
/// ```
/// use slirc_session::prefix::same_nick;
///
/// assert!(same_nick("Alice!a@host", "alice"));
/// assert!(same_nick("alice", "ALICE!other@elsewhere"));
/// assert!(!same_nick("alice!a@h", "alice2!a@h"));
/// ```
pub fn same_nick(a: &str, b: &str) -> bool {
    irc_eq(nick_of(a), nick_of(b))
}

/// Rebuild `prefix` with its nickname replaced, keeping `!user@host`.
///
/// Returns `None` when `prefix` has no `!` and therefore no user part to keep.
pub fn with_nick(prefix: &str, new_nick: &str) -> Option<String> {
    let bang = prefix.find('!')?;
    Some(format!("{}{}", new_nick, &prefix[bang..]))
}
