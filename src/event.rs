//! Events delivered to the host, and the [`Handler`] trait that receives them.
//!
//! Every event is dispatched synchronously on the session's own task, with
//! mutable access to the [`Session`] so a handler can reply, join channels
//! or call [`Session::kill`]. A handler that blocks stalls the session,
//! including liveness pings and flood-queue draining.

use std::time::Instant;

use crate::message::Message;
use crate::session::Session;

/// Something the session observed.
///
/// `prefix` fields carry the sender's full `nick!user@host` prefix as the
/// server sent it (empty if the line had none).
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Event {
    /// Every parsed inbound message, before any other event for it.
    Raw(Message),
    /// Registration completed (numeric 001).
    Connect,
    /// A connection attempt ended, whether it failed to connect or dropped
    /// later; channel and capability state is about to be cleared.
    Disconnect,
    /// Periodic tick. `last` is when the previous tick fired.
    Idle {
        /// Time of the previous idle tick.
        last: Instant,
    },
    /// The server pinged us; the PONG is already queued.
    Ping {
        /// The ping token.
        token: String,
    },
    /// A PRIVMSG.
    Privmsg {
        /// Sender.
        prefix: String,
        /// Channel or our nickname.
        target: String,
        /// Message text, verbatim.
        text: String,
    },
    /// A NOTICE.
    Notice {
        /// Sender.
        prefix: String,
        /// Channel or our nickname.
        target: String,
        /// Message text, verbatim.
        text: String,
    },
    /// Someone (possibly us) joined a channel.
    Join {
        /// Who joined.
        prefix: String,
        /// The channel.
        channel: String,
    },
    /// Someone (possibly us) left a channel.
    Part {
        /// Who left.
        prefix: String,
        /// The channel.
        channel: String,
        /// Part message.
        reason: Option<String>,
    },
    /// Someone quit the network.
    Quit {
        /// Who quit.
        prefix: String,
        /// Quit message.
        reason: Option<String>,
    },
    /// Someone was kicked from a channel.
    Kick {
        /// Who kicked.
        prefix: String,
        /// The channel.
        channel: String,
        /// Who was kicked: their full prefix if known, else the nickname.
        target: String,
        /// Kick reason.
        reason: Option<String>,
    },
    /// Someone changed nickname.
    Nick {
        /// The old prefix.
        prefix: String,
        /// The new nickname.
        nick: String,
    },
    /// We were invited to a channel.
    Invite {
        /// Who invited us.
        prefix: String,
        /// The invited nickname.
        target: String,
        /// The channel.
        channel: String,
    },
    /// A channel topic changed.
    Topic {
        /// Who changed it.
        prefix: String,
        /// The channel.
        channel: String,
        /// The previous topic, if one was known.
        old: Option<String>,
        /// The new topic.
        new: String,
    },
    /// One mode letter was set.
    ModeSet {
        /// Who changed it.
        prefix: String,
        /// The channel.
        channel: String,
        /// Mode letter.
        mode: char,
        /// The argument it consumed.
        arg: Option<String>,
    },
    /// One mode letter was unset.
    ModeUnset {
        /// Who changed it.
        prefix: String,
        /// The channel.
        channel: String,
        /// Mode letter.
        mode: char,
        /// The argument it consumed.
        arg: Option<String>,
    },
    /// A whole mode string was applied without error.
    Modes {
        /// Who changed it.
        prefix: String,
        /// The channel.
        channel: String,
        /// The mode string as received.
        modes: String,
        /// The arguments it consumed.
        args: Vec<String>,
    },
}

/// What to do with an outbound message after filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Send it (possibly rewritten).
    Send,
    /// Suppress it.
    Drop,
}

/// Receives session events and may veto outbound traffic.
///
/// Both methods have no-op defaults. Any `FnMut(&mut Session, &Event)`
/// closure is a handler.
pub trait Handler {
    /// Called for every event, inline on the session task.
    fn on_event(&mut self, session: &mut Session, event: &Event) {
        let _ = (session, event);
    }

    /// Called for every flood-limited outbound message before it is
    /// charged or queued. The message may be rewritten in place.
    fn filter_outgoing(&mut self, msg: &mut Message) -> Verdict {
        let _ = msg;
        Verdict::Send
    }
}

impl<F> Handler for F
where
    F: FnMut(&mut Session, &Event),
{
    fn on_event(&mut self, session: &mut Session, event: &Event) {
        self(session, event)
    }
}
