//! End-to-end scenarios driven through a sans-IO session.
//!
//! Each test feeds raw server bytes into a [`Session`] and checks the
//! resulting state, events and outbound wire bytes.

use std::time::{Duration, Instant};

use slirc_session::{ConnectionState, Event, Message, Registry, Session, SessionConfig};

struct Harness {
    session: Session,
    events: Vec<Event>,
}

impl Harness {
    fn new() -> Harness {
        let mut config = SessionConfig::new("irc.example.org", 6667, "bot");
        config.realname = "Scenario Bot".to_string();
        Harness {
            session: Session::new(config),
            events: Vec::new(),
        }
    }

    fn registered() -> Harness {
        let mut harness = Harness::new();
        harness.session.connected(Instant::now());
        harness.feed(
            ":srv 001 bot :Welcome\r\n\
             :srv 005 bot CHANMODES=b,k,l,imnpst PREFIX=(ov)@+ NETWORK=Example :are supported\r\n",
        );
        harness.session.take_wire();
        harness.events.clear();
        harness
    }

    fn feed(&mut self, bytes: &str) {
        let events = &mut self.events;
        let mut handler = |_: &mut Session, event: &Event| {
            if !matches!(event, Event::Raw(_)) {
                events.push(event.clone());
            }
        };
        self.session
            .receive(bytes.as_bytes(), Instant::now(), &mut handler);
    }

    fn wire(&mut self) -> String {
        String::from_utf8(self.session.take_wire().to_vec()).unwrap()
    }
}

#[test]
fn test_privmsg_is_parsed_and_delivered() {
    let msg: Message = ":nick!u@h PRIVMSG #c :hello there".parse().unwrap();
    assert_eq!(msg.prefix.as_deref(), Some("nick!u@h"));
    assert_eq!(msg.command, "PRIVMSG");
    assert_eq!(msg.params, ["#c"]);
    assert_eq!(msg.trailing.as_deref(), Some("hello there"));

    let mut harness = Harness::registered();
    harness.feed(":nick!u@h PRIVMSG #c :hello there\r\n");
    assert_eq!(
        harness.events,
        [Event::Privmsg {
            prefix: "nick!u@h".into(),
            target: "#c".into(),
            text: "hello there".into(),
        }]
    );
}

#[test]
fn test_op_and_voice_applied_from_capabilities() {
    let mut harness = Harness::registered();
    harness.feed(":bot!b@h JOIN #c\r\n:alice!a@h JOIN #c\r\n:bob!b@h JOIN #c\r\n");
    harness.events.clear();

    harness.feed(":op!o@h MODE #c +ov alice bob\r\n");

    let chan = harness.session.channel("#c").unwrap();
    let alice = chan.find_user("alice").unwrap();
    let bob = chan.find_user("bob").unwrap();
    assert!(alice.has_privilege('o') && !alice.has_privilege('v'));
    assert!(bob.has_privilege('v') && !bob.has_privilege('o'));
    assert_eq!(
        harness.events.last(),
        Some(&Event::Modes {
            prefix: "op!o@h".into(),
            channel: "#c".into(),
            modes: "+ov".into(),
            args: vec!["alice".into(), "bob".into()],
        })
    );
}

#[test]
fn test_flood_limit_queues_sixth_message() {
    let mut harness = Harness::registered();
    let t0 = Instant::now();
    let mut handler = |_: &mut Session, _: &Event| {};

    for _ in 0..6 {
        harness.session.send(Message::new("PING").with_param("abcde"));
    }
    harness.session.tick(t0, &mut handler);
    assert_eq!(harness.wire(), "PING abcde\r\n".repeat(5));
    assert_eq!(harness.session.queued(), 1);

    harness
        .session
        .tick(t0 + Duration::from_millis(500), &mut handler);
    assert_eq!(harness.wire(), "");
    assert_eq!(harness.session.queued(), 1);

    harness.session.tick(t0 + Duration::from_secs(1), &mut handler);
    assert_eq!(harness.wire(), "PING abcde\r\n");
    assert_eq!(harness.session.queued(), 0);
}

#[test]
fn test_nick_change_keeps_per_channel_privileges() {
    let mut harness = Harness::registered();
    harness.feed(
        ":bot!b@h JOIN #foo\r\n\
         :bot!b@h JOIN #bar\r\n\
         :alice!a@h JOIN #foo\r\n\
         :alice!a@h JOIN #bar\r\n\
         :srv MODE #foo +o alice\r\n",
    );
    harness.events.clear();

    harness.feed(":alice!a@h NICK :alice2\r\n");
    assert_eq!(
        harness.events,
        [Event::Nick {
            prefix: "alice!a@h".into(),
            nick: "alice2".into(),
        }]
    );

    let foo = harness.session.channel("#foo").unwrap();
    let bar = harness.session.channel("#bar").unwrap();
    assert!(foo.find_user("alice").is_none());
    assert!(bar.find_user("alice").is_none());
    assert_eq!(foo.find_user("alice2").unwrap().prefix(), "alice2!a@h");
    assert!(foo.find_user("alice2").unwrap().has_privilege('o'));
    assert!(!bar.find_user("alice2").unwrap().has_privilege('o'));
}

#[test]
fn test_duplicate_join_does_not_duplicate_roster() {
    let mut harness = Harness::registered();
    harness.feed(":bot!b@h JOIN #c\r\n:alice!a@h JOIN #c\r\n:alice!a@h JOIN #c\r\n");
    assert_eq!(harness.session.channel("#c").unwrap().user_count(), 1);

    let mut registry = Registry::new();
    registry.add_channel("#c");
    assert!(registry.add_user("#c", "alice!a@h"));
    assert!(!registry.add_user("#c", "alice!a@h"));
    assert_eq!(registry.get_channel("#c").unwrap().user_count(), 1);
}

#[test]
fn test_disconnect_clears_state_and_relogs_in() {
    let mut harness = Harness::registered();
    harness.feed(":bot!b@h JOIN #c\r\n");
    harness.session.privmsg("#c", "never sent");
    harness.wire();
    harness.events.clear();

    let events = &mut harness.events;
    let mut handler = |session: &mut Session, event: &Event| {
        if let Event::Disconnect = event {
            // state is still readable while the handler runs
            assert!(session.channel("#c").is_some());
        }
        events.push(event.clone());
    };
    harness.session.disconnected(&mut handler);

    assert_eq!(harness.events, [Event::Disconnect]);
    assert_eq!(harness.session.state(), ConnectionState::Disconnected);
    assert_eq!(harness.session.channels().count(), 0);
    assert!(harness.session.isupport().is_empty());

    harness.session.connected(Instant::now());
    assert_eq!(
        harness.wire(),
        "NICK bot\r\nUSER bot 0 * :Scenario Bot\r\n"
    );

    let mut handler = |_: &mut Session, _: &Event| {};
    harness.session.tick(Instant::now(), &mut handler);
    assert_eq!(harness.wire(), "");
}

#[test]
fn test_handler_replies_from_inside_dispatch() {
    let mut harness = Harness::registered();
    let mut handler = |session: &mut Session, event: &Event| {
        if let Event::Privmsg { prefix, target, text } = event {
            if text == "!ping" {
                session.respond(target, prefix, "pong");
            }
        }
    };
    harness.session.receive(
        b":bot!b@h JOIN #c\r\n:alice!a@h PRIVMSG #c :!ping\r\n",
        Instant::now(),
        &mut handler,
    );
    harness.session.tick(Instant::now(), &mut handler);
    assert!(harness.wire().ends_with("PRIVMSG #c :alice: pong\r\n"));
}

#[test]
fn test_kill_from_handler() {
    let mut harness = Harness::registered();
    let handle = harness.session.kill_handle();
    let mut handler = |session: &mut Session, event: &Event| {
        if let Event::Privmsg { text, .. } = event {
            if text == "!quit" {
                session.quit(Some("bye"));
                session.kill();
            }
        }
    };
    harness.session.receive(
        b":owner!o@h PRIVMSG bot :!quit\r\n",
        Instant::now(),
        &mut handler,
    );
    harness.session.tick(Instant::now(), &mut handler);
    assert!(handle.is_killed());
    assert_eq!(harness.wire(), "QUIT :bye\r\n");
}
