//! Inbound dispatch: state updates and events for every parsed message.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::chan::ChannelExt;
use crate::event::{Event, Handler};
use crate::message::Message;
use crate::mode::apply_mode_change;
use crate::prefix::{same_nick, with_nick};
use crate::response::Response;
use crate::state::{parse_unix_time, ConnectionState};

use super::Session;

/// Times a rejected nickname gets `_` appended before we give up.
pub(super) const MAX_NICK_RETRIES: u32 = 5;

/// Checks argument count, logging and skipping the line when short.
macro_rules! require_args {
    ($msg:expr, $n:expr) => {
        if let Err(err) = $msg.require_args($n) {
            warn!(%err, "malformed message skipped");
            return;
        }
    };
}

impl Session {
    /// Update state from one parsed message and fire its events.
    ///
    /// A [`Event::Raw`] always fires first.
    pub fn handle_message<H: Handler>(&mut self, msg: Message, handler: &mut H) {
        self.emit(handler, Event::Raw(msg.clone()));

        if let Some(response) = msg.response() {
            self.handle_response(response, &msg, handler);
            return;
        }

        match msg.command.as_str() {
            "PING" => self.on_ping(&msg, handler),
            "ERROR" => {
                warn!(reason = msg.arg(0).unwrap_or_default(), "server sent ERROR");
            }
            "PRIVMSG" | "NOTICE" => self.on_message(&msg, handler),
            "JOIN" => self.on_join(&msg, handler),
            "PART" => self.on_part(&msg, handler),
            "KICK" => self.on_kick(&msg, handler),
            "QUIT" => self.on_quit(&msg, handler),
            "NICK" => self.on_nick(&msg, handler),
            "INVITE" => self.on_invite(&msg, handler),
            "TOPIC" => self.on_topic(&msg, handler),
            "MODE" => self.on_mode(&msg, handler),
            _ => {}
        }
    }

    fn handle_response<H: Handler>(&mut self, response: Response, msg: &Message, handler: &mut H) {
        match response {
            Response::RPL_WELCOME => {
                if let Some(nick) = msg.arg(0) {
                    self.nick = nick.to_owned();
                }
                self.state = ConnectionState::Active;
                info!(nick = %self.nick, "registered with server");
                self.emit(handler, Event::Connect);
            }
            Response::RPL_ISUPPORT => {
                // first param is our nick, the last one the "are supported" text
                self.isupport.ingest(msg.params.iter().skip(1).map(String::as_str));
            }
            Response::ERR_NICKNAMEINUSE | Response::ERR_ERRONEUSNICKNAME
                if self.state == ConnectionState::LoggingIn =>
            {
                if self.nick_retries >= MAX_NICK_RETRIES {
                    warn!(nick = %self.nick, "no usable nickname, quitting");
                    self.send_immediate(Message::quit(Some("no usable nickname")));
                    return;
                }
                self.nick_retries += 1;
                let retry = format!("{}_", self.nick);
                info!(taken = %self.nick, retry = %retry, "nickname rejected, retrying");
                self.nick = retry;
                let nick = Message::nick(&self.nick);
                self.send_immediate(nick);
            }
            Response::RPL_TOPIC => {
                require_args!(msg, 3);
                if let (Some(channel), Some(topic)) = (msg.arg(1), msg.arg(2)) {
                    if let Some(chan) = self.registry.channel_mut(channel) {
                        chan.set_topic(topic);
                    }
                }
            }
            Response::RPL_TOPICWHOTIME => {
                require_args!(msg, 4);
                if let (Some(channel), Some(setter), Some(time)) =
                    (msg.arg(1), msg.arg(2), msg.arg(3))
                {
                    if let Some(chan) = self.registry.channel_mut(channel) {
                        chan.set_topic_meta(setter, parse_unix_time(time));
                    }
                }
            }
            Response::RPL_CREATIONTIME => {
                require_args!(msg, 3);
                if let (Some(channel), Some(time)) = (msg.arg(1), msg.arg(2)) {
                    match (self.registry.channel_mut(channel), parse_unix_time(time)) {
                        (Some(chan), Some(created)) => chan.set_created(created),
                        (Some(_), None) => {
                            warn!(channel = %channel, time = %time, "bad creation time")
                        }
                        (None, _) => {}
                    }
                }
            }
            Response::RPL_CHANNELMODEIS => {
                require_args!(msg, 3);
                let prefix = msg.prefix.clone().unwrap_or_default();
                let args: Vec<String> = msg.args().skip(3).map(str::to_owned).collect();
                if let (Some(channel), Some(modes)) = (msg.arg(1), msg.arg(2)) {
                    self.apply_modes(&prefix, channel, modes, args, handler);
                }
            }
            Response::RPL_WHOREPLY => {
                require_args!(msg, 7);
                self.on_who_reply(msg);
            }
            Response::RPL_BANLIST => self.add_list_entry(msg, 'b'),
            Response::RPL_INVITELIST => {
                let mode = self.isupport.invex_mode().unwrap_or('I');
                self.add_list_entry(msg, mode);
            }
            Response::RPL_EXCEPTLIST => {
                let mode = self.isupport.excepts_mode().unwrap_or('e');
                self.add_list_entry(msg, mode);
            }
            _ => {}
        }
    }

    fn on_ping<H: Handler>(&mut self, msg: &Message, handler: &mut H) {
        require_args!(msg, 1);
        let token = msg.arg(0).unwrap_or_default().to_owned();
        let now = self.last_activity;
        self.send_limited(Message::pong(&token), now, handler);
        self.emit(handler, Event::Ping { token });
    }

    fn on_message<H: Handler>(&mut self, msg: &Message, handler: &mut H) {
        require_args!(msg, 2);
        let prefix = msg.prefix.clone().unwrap_or_default();
        let target = msg.arg(0).unwrap_or_default().to_owned();
        let text = msg.arg(1).unwrap_or_default().to_owned();
        let event = if msg.is_command("PRIVMSG") {
            Event::Privmsg { prefix, target, text }
        } else {
            Event::Notice { prefix, target, text }
        };
        self.emit(handler, event);
    }

    fn on_join<H: Handler>(&mut self, msg: &Message, handler: &mut H) {
        require_args!(msg, 1);
        let prefix = msg.prefix.clone().unwrap_or_default();
        let channel = msg.arg(0).unwrap_or_default().to_owned();

        if same_nick(&prefix, &self.nick) {
            self.registry.add_channel(&channel);
            let now = self.last_activity;
            self.send_limited(Message::who(&channel), now, handler);
            self.send_limited(Message::mode(&channel, &[]), now, handler);
            self.send_limited(Message::mode(&channel, &["+b"]), now, handler);
        } else {
            self.registry.add_user(&channel, &prefix);
        }

        self.emit(handler, Event::Join { prefix, channel });
    }

    fn on_part<H: Handler>(&mut self, msg: &Message, handler: &mut H) {
        require_args!(msg, 1);
        let prefix = msg.prefix.clone().unwrap_or_default();
        let channel = msg.arg(0).unwrap_or_default().to_owned();
        let reason = msg.arg(1).map(str::to_owned);

        self.emit(
            handler,
            Event::Part {
                prefix: prefix.clone(),
                channel: channel.clone(),
                reason,
            },
        );

        if same_nick(&prefix, &self.nick) {
            self.registry.remove_channel(&channel);
        } else {
            self.registry.remove_user(&channel, &prefix);
        }
    }

    fn on_kick<H: Handler>(&mut self, msg: &Message, handler: &mut H) {
        require_args!(msg, 2);
        let prefix = msg.prefix.clone().unwrap_or_default();
        let channel = msg.arg(0).unwrap_or_default().to_owned();
        let kicked = msg.arg(1).unwrap_or_default().to_owned();
        let target = self
            .registry
            .find_user(&channel, &kicked)
            .map_or_else(|| kicked.clone(), |user| user.prefix().to_owned());

        self.emit(
            handler,
            Event::Kick {
                prefix,
                channel: channel.clone(),
                target,
                reason: msg.arg(2).map(str::to_owned),
            },
        );

        if same_nick(&kicked, &self.nick) {
            info!(channel = %channel, "kicked from channel");
            self.registry.remove_channel(&channel);
        } else {
            self.registry.remove_user(&channel, &kicked);
        }
    }

    fn on_quit<H: Handler>(&mut self, msg: &Message, handler: &mut H) {
        let prefix = msg.prefix.clone().unwrap_or_default();
        self.emit(
            handler,
            Event::Quit {
                prefix: prefix.clone(),
                reason: msg.arg(0).map(str::to_owned),
            },
        );
        self.registry.remove_everywhere(&prefix);
    }

    fn on_nick<H: Handler>(&mut self, msg: &Message, handler: &mut H) {
        require_args!(msg, 1);
        let prefix = msg.prefix.clone().unwrap_or_default();
        let nick = msg.arg(0).unwrap_or_default().to_owned();

        if same_nick(&prefix, &self.nick) {
            info!(old = %self.nick, new = %nick, "our nickname changed");
            self.nick = nick.clone();
        }

        match with_nick(&prefix, &nick) {
            Some(renamed) => {
                let channels = self.registry.rename_everywhere(&prefix, &renamed);
                debug!(old = %prefix, new = %renamed, channels = channels.len(), "user renamed");
                self.emit(handler, Event::Nick { prefix, nick });
            }
            None => warn!(prefix = %prefix, "nick change from invalid user prefix"),
        }
    }

    fn on_invite<H: Handler>(&mut self, msg: &Message, handler: &mut H) {
        require_args!(msg, 2);
        let event = Event::Invite {
            prefix: msg.prefix.clone().unwrap_or_default(),
            target: msg.arg(0).unwrap_or_default().to_owned(),
            channel: msg.arg(1).unwrap_or_default().to_owned(),
        };
        self.emit(handler, event);
    }

    fn on_topic<H: Handler>(&mut self, msg: &Message, handler: &mut H) {
        require_args!(msg, 2);
        let prefix = msg.prefix.clone().unwrap_or_default();
        let channel = msg.arg(0).unwrap_or_default().to_owned();
        let new = msg.arg(1).unwrap_or_default().to_owned();

        let old = match self.registry.channel_mut(&channel) {
            Some(chan) => {
                let old = chan.topic().map(str::to_owned);
                chan.set_topic(&new);
                chan.set_topic_meta(&prefix, Some(Utc::now()));
                old
            }
            None => None,
        };

        self.emit(
            handler,
            Event::Topic {
                prefix,
                channel,
                old,
                new,
            },
        );
    }

    fn on_mode<H: Handler>(&mut self, msg: &Message, handler: &mut H) {
        require_args!(msg, 1);
        let target = msg.arg(0).unwrap_or_default();
        if !target.is_channel_name() {
            debug!(target = %target, "ignoring user mode");
            return;
        }
        require_args!(msg, 2);

        let prefix = msg.prefix.clone().unwrap_or_default();
        let channel = target.to_owned();
        let modes = msg.arg(1).unwrap_or_default().to_owned();
        let args: Vec<String> = msg.args().skip(2).map(str::to_owned).collect();
        self.apply_modes(&prefix, &channel, &modes, args, handler);
    }

    /// Apply a mode string, then fire one event per applied letter and, if
    /// the whole string went through, one for the string itself.
    fn apply_modes<H: Handler>(
        &mut self,
        prefix: &str,
        channel: &str,
        modes: &str,
        args: Vec<String>,
        handler: &mut H,
    ) {
        let application = match apply_mode_change(
            &mut self.registry,
            &self.isupport,
            channel,
            modes,
            args.iter().map(String::as_str),
        ) {
            Ok(application) => application,
            Err(_) => return,
        };

        for change in &application.changes {
            let (prefix, channel, mode, arg) =
                (prefix.to_owned(), channel.to_owned(), change.mode, change.arg.clone());
            let event = if change.set {
                Event::ModeSet { prefix, channel, mode, arg }
            } else {
                Event::ModeUnset { prefix, channel, mode, arg }
            };
            self.emit(handler, event);
        }

        if application.is_complete() {
            let mut args = args;
            args.truncate(application.consumed);
            self.emit(
                handler,
                Event::Modes {
                    prefix: prefix.to_owned(),
                    channel: channel.to_owned(),
                    modes: modes.to_owned(),
                    args,
                },
            );
        }
    }

    fn on_who_reply(&mut self, msg: &Message) {
        let (Some(channel), Some(user), Some(host), Some(nick), Some(flags)) =
            (msg.arg(1), msg.arg(2), msg.arg(3), msg.arg(5), msg.arg(6))
        else {
            return;
        };

        let prefix = format!("{}!{}@{}", nick, user, host);
        let privileges: Vec<char> = flags
            .chars()
            .filter_map(|symbol| self.isupport.privilege_for_symbol(symbol))
            .collect();

        let Some(chan) = self.registry.channel_mut(channel) else {
            return;
        };
        if chan.find_user(&prefix).is_some() {
            warn!(channel = %channel, user = %prefix, "WHO reply for user already in channel");
            return;
        }
        chan.add_user(&prefix);
        if let Some(member) = chan.find_user_mut(&prefix) {
            for mode in privileges {
                member.grant(mode);
            }
        }
    }

    fn add_list_entry(&mut self, msg: &Message, mode: char) {
        require_args!(msg, 3);
        let (Some(channel), Some(entry)) = (msg.arg(1), msg.arg(2)) else {
            return;
        };
        if let Some(chan) = self.registry.channel_mut(channel) {
            chan.add_list_entry(mode, entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::config::SessionConfig;
    use crate::state::ModeValue;

    fn registered() -> Session {
        let mut session = Session::new(SessionConfig::new("irc.example.org", 6667, "bot"));
        let mut handler = |_: &mut Session, _: &Event| {};
        session.connected(Instant::now());
        session.receive(
            b":srv 001 bot :Welcome\r\n\
              :srv 005 bot CHANMODES=beI,k,l,imnpst PREFIX=(ov)@+ EXCEPTS INVEX :are supported\r\n",
            Instant::now(),
            &mut handler,
        );
        session.take_wire();
        session
    }

    fn feed(session: &mut Session, lines: &str) -> Vec<Event> {
        let mut events = Vec::new();
        let mut handler = |_: &mut Session, event: &Event| {
            if !matches!(event, Event::Raw(_)) {
                events.push(event.clone());
            }
        };
        for line in lines.lines() {
            session.handle_line(line, &mut handler);
        }
        events
    }

    #[test]
    fn test_ping_pong() {
        let mut session = registered();
        let events = feed(&mut session, "PING :irc.example.org");
        assert_eq!(&session.take_wire()[..], b"PONG :irc.example.org\r\n");
        assert_eq!(
            events,
            [Event::Ping {
                token: "irc.example.org".into()
            }]
        );
    }

    #[test]
    fn test_self_join_bootstraps_channel() {
        let mut session = registered();
        let events = feed(
            &mut session,
            ":bot!b@h JOIN #rust\n\
             :srv 332 bot #rust :Rust talk\n\
             :srv 333 bot #rust alice!a@h 1700000000\n\
             :srv 329 bot #rust 1600000000\n\
             :srv 352 bot #rust a h srv alice H@ :0 Alice\n\
             :srv 352 bot #rust b h srv bob G+ :0 Bob\n\
             :srv 324 bot #rust +nt\n\
             :srv 367 bot #rust *!*@spam setter 1700000000\n\
             :srv 348 bot #rust *!*@friend\n\
             :srv 346 bot #rust *!*@guest",
        );
        assert_eq!(
            &session.take_wire()[..],
            b"WHO #rust\r\nMODE #rust\r\nMODE #rust +b\r\n"
        );
        assert!(matches!(&events[0], Event::Join { channel, .. } if channel == "#rust"));

        let chan = session.channel("#RUST").unwrap();
        assert_eq!(chan.topic(), Some("Rust talk"));
        assert_eq!(chan.topic_setter(), Some("alice!a@h"));
        assert_eq!(chan.created().timestamp(), 1_600_000_000);
        assert!(chan.find_user("alice").unwrap().has_privilege('o'));
        assert!(chan.find_user("bob").unwrap().has_privilege('v'));
        assert_eq!(chan.mode('n'), Some(&ModeValue::Simple));
        assert_eq!(chan.list('b'), ["*!*@spam"]);
        assert_eq!(chan.list('e'), ["*!*@friend"]);
        assert_eq!(chan.list('I'), ["*!*@guest"]);
    }

    #[test]
    fn test_who_reply_leaves_known_user_alone() {
        let mut session = registered();
        feed(
            &mut session,
            ":bot!b@h JOIN #c\n\
             :alice!a@h JOIN #c\n\
             :srv 352 bot #c a h srv alice H@ :0 Alice\n\
             :srv 352 bot #c c h srv carol H+ :0 Carol",
        );
        let chan = session.channel("#c").unwrap();
        assert!(!chan.find_user("alice").unwrap().has_privilege('o'));
        assert!(chan.find_user("carol").unwrap().has_privilege('v'));
        assert_eq!(chan.users().filter(|u| u.nick() == "alice").count(), 1);
    }

    #[test]
    fn test_nick_retry_gives_up() {
        let mut session = Session::new(SessionConfig::new("irc.example.org", 6667, "bot"));
        session.connected(Instant::now());
        session.take_wire();
        for _ in 0..MAX_NICK_RETRIES {
            feed(&mut session, ":srv 432 * x :Erroneous nickname");
        }
        assert_eq!(session.nick(), "bot_____");
        session.take_wire();

        feed(&mut session, ":srv 432 * bot_____ :Erroneous nickname");
        assert_eq!(&session.take_wire()[..], b"QUIT :no usable nickname\r\n");
        assert_eq!(session.nick(), "bot_____");

        session.connected(Instant::now());
        session.take_wire();
        feed(&mut session, ":srv 433 * bot :Nickname is already in use");
        assert_eq!(&session.take_wire()[..], b"NICK bot_\r\n");
    }

    #[test]
    fn test_part_and_kick_remove_state() {
        let mut session = registered();
        feed(
            &mut session,
            ":bot!b@h JOIN #a\n:bot!b@h JOIN #b\n:carol!c@h JOIN #a\n:dave!d@h JOIN #a",
        );
        let events = feed(&mut session, ":carol!c@h PART #a :bye\n:op!o@h KICK #a dave :out");
        assert_eq!(
            events[1],
            Event::Kick {
                prefix: "op!o@h".into(),
                channel: "#a".into(),
                target: "dave!d@h".into(),
                reason: Some("out".into()),
            }
        );
        assert_eq!(session.channel("#a").unwrap().user_count(), 0);

        feed(&mut session, ":bot!b@h PART #a\n:op!o@h KICK #b bot");
        assert_eq!(session.channels().count(), 0);
    }

    #[test]
    fn test_quit_leaves_every_channel() {
        let mut session = registered();
        feed(
            &mut session,
            ":bot!b@h JOIN #a\n:bot!b@h JOIN #b\n:erin!e@h JOIN #a\n:erin!e@h JOIN #b",
        );
        let events = feed(&mut session, ":erin!e@h QUIT :gone");
        assert_eq!(
            events,
            [Event::Quit {
                prefix: "erin!e@h".into(),
                reason: Some("gone".into())
            }]
        );
        assert!(session.channel("#a").unwrap().find_user("erin").is_none());
        assert!(session.channel("#b").unwrap().find_user("erin").is_none());
    }

    #[test]
    fn test_own_nick_change() {
        let mut session = registered();
        feed(&mut session, ":bot!b@h JOIN #a\n:bot!b@h NICK :newbot");
        assert_eq!(session.nick(), "newbot");
    }

    #[test]
    fn test_nick_retry_only_while_logging_in() {
        let mut session = Session::new(SessionConfig::new("irc.example.org", 6667, "bot"));
        session.connected(Instant::now());
        session.take_wire();
        feed(&mut session, ":srv 433 * bot :Nickname is already in use");
        assert_eq!(&session.take_wire()[..], b"NICK bot_\r\n");
        feed(&mut session, ":srv 001 bot_ :Welcome");
        assert_eq!(session.nick(), "bot_");

        feed(&mut session, ":srv 433 bot_ other :Nickname is already in use");
        assert!(!session.has_wire());
    }

    #[test]
    fn test_topic_change_reports_old_topic() {
        let mut session = registered();
        feed(&mut session, ":bot!b@h JOIN #a\n:srv 332 bot #a :first");
        let events = feed(&mut session, ":alice!a@h TOPIC #a :second");
        assert_eq!(
            events,
            [Event::Topic {
                prefix: "alice!a@h".into(),
                channel: "#a".into(),
                old: Some("first".into()),
                new: "second".into(),
            }]
        );
        let chan = session.channel("#a").unwrap();
        assert_eq!(chan.topic(), Some("second"));
        assert_eq!(chan.topic_setter(), Some("alice!a@h"));
    }

    #[test]
    fn test_mode_events() {
        let mut session = registered();
        feed(&mut session, ":bot!b@h JOIN #a\n:alice!a@h JOIN #a");
        let events = feed(&mut session, ":op!o@h MODE #a +o-n alice");
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            Event::ModeSet { mode: 'o', arg: Some(a), .. } if a == "alice"
        ));
        assert!(matches!(&events[1], Event::ModeUnset { mode: 'n', arg: None, .. }));
        assert!(matches!(
            &events[2],
            Event::Modes { modes, args, .. } if modes == "+o-n" && args == &["alice".to_string()]
        ));
        let alice = session.channel("#a").unwrap().find_user("alice").unwrap();
        assert!(alice.has_privilege('o'));
    }

    #[test]
    fn test_aborted_mode_string_skips_summary() {
        let mut session = registered();
        feed(&mut session, ":bot!b@h JOIN #a");
        let events = feed(&mut session, ":op!o@h MODE #a +mk");
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::ModeSet { mode: 'm', .. }));
    }

    #[test]
    fn test_user_mode_ignored() {
        let mut session = registered();
        assert!(feed(&mut session, ":bot MODE bot :+i").is_empty());
    }

    #[test]
    fn test_short_lines_are_skipped() {
        let mut session = registered();
        assert!(feed(&mut session, ":x!y@z KICK #a\nPRIVMSG\n:srv 332 bot").is_empty());
    }
}
