//! Constructors for the commands a client sends.

use super::Message;

const CTCP_DELIM: char = '\x01';

fn ctcp_body(command: &str, args: Option<&str>) -> String {
    match args {
        Some(args) if !args.is_empty() => format!("{CTCP_DELIM}{command} {args}{CTCP_DELIM}"),
        _ => format!("{CTCP_DELIM}{command}{CTCP_DELIM}"),
    }
}

impl Message {
    /// `PRIVMSG <target> :<text>`
    pub fn privmsg(target: &str, text: &str) -> Message {
        Message::new("PRIVMSG").with_param(target).with_trailing(text)
    }

    /// `NOTICE <target> :<text>`
    pub fn notice(target: &str, text: &str) -> Message {
        Message::new("NOTICE").with_param(target).with_trailing(text)
    }

    /// `JOIN <channel> [<key>]`
    pub fn join(channel: &str, key: Option<&str>) -> Message {
        let msg = Message::new("JOIN").with_param(channel);
        match key {
            Some(key) => msg.with_param(key),
            None => msg,
        }
    }

    /// `PART <channel> [:<reason>]`
    pub fn part(channel: &str, reason: Option<&str>) -> Message {
        let msg = Message::new("PART").with_param(channel);
        match reason {
            Some(reason) => msg.with_trailing(reason),
            None => msg,
        }
    }

    /// `QUIT [:<reason>]`
    pub fn quit(reason: Option<&str>) -> Message {
        let msg = Message::new("QUIT");
        match reason {
            Some(reason) => msg.with_trailing(reason),
            None => msg,
        }
    }

    /// `KICK <channel> <nick> [:<reason>]`
    pub fn kick(channel: &str, nick: &str, reason: Option<&str>) -> Message {
        let msg = Message::new("KICK").with_param(channel).with_param(nick);
        match reason {
            Some(reason) => msg.with_trailing(reason),
            None => msg,
        }
    }

    /// `NICK <nick>`
    pub fn nick(nick: &str) -> Message {
        Message::new("NICK").with_param(nick)
    }

    /// `USER <user> 0 * :<realname>`
    pub fn user(user: &str, realname: &str) -> Message {
        Message::new("USER")
            .with_param(user)
            .with_param("0")
            .with_param("*")
            .with_trailing(realname)
    }

    /// `PASS <password>`
    pub fn pass(password: &str) -> Message {
        Message::new("PASS").with_param(password)
    }

    /// `PING <token>`
    pub fn ping(token: &str) -> Message {
        Message::new("PING").with_param(token)
    }

    /// `PONG :<token>`
    pub fn pong(token: &str) -> Message {
        Message::new("PONG").with_trailing(token)
    }

    /// `WHO <mask>`
    pub fn who(mask: &str) -> Message {
        Message::new("WHO").with_param(mask)
    }

    /// `MODE <target> [<modes> [<args>...]]`
    pub fn mode(target: &str, modes: &[&str]) -> Message {
        modes
            .iter()
            .fold(Message::new("MODE").with_param(target), |msg, m| {
                msg.with_param(*m)
            })
    }

    /// `TOPIC <channel> [:<topic>]`; without a topic this queries it.
    pub fn topic(channel: &str, topic: Option<&str>) -> Message {
        let msg = Message::new("TOPIC").with_param(channel);
        match topic {
            Some(topic) => msg.with_trailing(topic),
            None => msg,
        }
    }

    /// A CTCP request, carried in a PRIVMSG.
    pub fn ctcp_request(target: &str, command: &str, args: Option<&str>) -> Message {
        Message::privmsg(target, &ctcp_body(command, args))
    }

    /// A CTCP reply, carried in a NOTICE.
    pub fn ctcp_response(target: &str, command: &str, args: Option<&str>) -> Message {
        Message::notice(target, &ctcp_body(command, args))
    }
}
