//! Outbound traffic: the host-facing send helpers, flood-limited draining
//! and the immediate path used for registration and liveness.

use std::time::Instant;

use tracing::{debug, trace};

use crate::chan::proper_target;
use crate::event::{Handler, Verdict};
use crate::flood::Admission;
use crate::message::Message;
use crate::prefix::nick_of;

use super::Session;

impl Session {
    /// Queue a message. On the next [`Session::tick`] it passes through the
    /// handler's filter and then flood control.
    pub fn send(&mut self, msg: Message) {
        self.outbox.push_back(msg);
    }

    /// Encode a message straight onto the wire, bypassing the filter and
    /// the flood limiter.
    pub fn send_immediate(&mut self, msg: Message) {
        self.write_line(&msg);
    }

    /// Send a PRIVMSG.
    pub fn privmsg(&mut self, target: &str, text: &str) {
        self.send(Message::privmsg(target, text));
    }

    /// Send a NOTICE.
    pub fn notice(&mut self, target: &str, text: &str) {
        self.send(Message::notice(target, text));
    }

    /// Join a channel, optionally with a key.
    pub fn join(&mut self, channel: &str, key: Option<&str>) {
        self.send(Message::join(channel, key));
    }

    /// Leave a channel.
    pub fn part(&mut self, channel: &str, reason: Option<&str>) {
        self.send(Message::part(channel, reason));
    }

    /// Quit the server. The session reconnects afterwards unless killed.
    pub fn quit(&mut self, reason: Option<&str>) {
        self.send(Message::quit(reason));
    }

    /// Kick someone from a channel.
    pub fn kick(&mut self, channel: &str, nick: &str, reason: Option<&str>) {
        self.send(Message::kick(channel, nick, reason));
    }

    /// Reply to a message that arrived on `target` from `sender`.
    ///
    /// In a channel the reply is addressed as `nick: text`; in private it
    /// goes straight back to the sender.
    pub fn respond(&mut self, target: &str, sender: &str, text: &str) {
        let nick = nick_of(sender);
        let to = proper_target(target, nick);
        let msg = if to == nick {
            Message::privmsg(to, text)
        } else {
            Message::privmsg(to, &format!("{}: {}", nick, text))
        };
        self.send(msg);
    }

    /// Send a CTCP request.
    pub fn ctcp_request(&mut self, target: &str, command: &str, args: Option<&str>) {
        self.send(Message::ctcp_request(target, command, args));
    }

    /// Send a CTCP reply.
    pub fn ctcp_response(&mut self, target: &str, command: &str, args: Option<&str>) {
        self.send(Message::ctcp_response(target, command, args));
    }

    /// Drain what the bucket allows: first the flood queue in order, then
    /// every message the host queued since the last tick.
    pub(super) fn flush_outbound<H: Handler>(&mut self, now: Instant, handler: &mut H) {
        while let Some(msg) = self.flood.pop_ready_at(now) {
            self.write_line(&msg);
        }

        while let Some(mut msg) = self.outbox.pop_front() {
            if handler.filter_outgoing(&mut msg) == Verdict::Drop {
                debug!(command = %msg.command, "outgoing message vetoed by handler");
                continue;
            }
            match self.flood.submit_at(msg, now) {
                Admission::Send(msg) => self.write_line(&msg),
                Admission::Queued | Admission::Dropped => {}
            }
        }
    }

    /// Limited send from inside dispatch: filtered and charged right away.
    pub(super) fn send_limited<H: Handler>(&mut self, msg: Message, now: Instant, handler: &mut H) {
        self.outbox.push_back(msg);
        self.flush_outbound(now, handler);
    }

    fn write_line(&mut self, msg: &Message) {
        if msg.is_command("PASS") {
            debug!(">> PASS ****");
        } else {
            debug!(">> {}", msg);
        }
        let written = self.codec.encode_message(msg, &mut self.wire);
        trace!(bytes = written, "encoded");
    }
}
