//! Sans-IO session engine.
//!
//! [`Session`] owns everything one server connection needs except the
//! socket: the receive buffer, the outbound queue and flood control, the
//! channel [`Registry`], the [`Isupport`] table and the current nickname.
//! Whoever owns the socket drives it:
//!
//! 1. [`Session::connected`] after the transport is up (queues `PASS`,
//!    `NICK`, `USER`),
//! 2. [`Session::receive`] with every chunk of bytes read,
//! 3. [`Session::check_liveness`] whenever a read times out,
//! 4. [`Session::tick`] once per loop iteration,
//! 5. [`Session::take_wire`] to collect bytes to write,
//! 6. [`Session::disconnected`] when the connection drops.
//!
//! The tokio [`Client`](crate::client::Client) is one such driver; tests
//! drive a session directly.
//!
//! # Example
//!
//! ```
//! use std::time::Instant;
//! use slirc_session::{Event, Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::new("irc.example.org", 6667, "bot"));
//! let mut handler = |_: &mut Session, _: &Event| {};
//!
//! session.connected(Instant::now());
//! assert_eq!(&session.take_wire()[..], b"NICK bot\r\nUSER bot 0 * :bot\r\n");
//!
//! session.receive(b":irc.example.org 001 bot :Welcome\r\n", Instant::now(), &mut handler);
//! assert!(session.state().is_connected());
//! ```

mod dispatch;
mod outbound;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::event::{Event, Handler};
use crate::flood::FloodControl;
use crate::isupport::Isupport;
use crate::line::LineCodec;
use crate::message::Message;
use crate::state::{Channel, ConnectionState, Registry};

/// A cloneable, thread-safe handle that stops a session.
///
/// The session finishes its current loop iteration and does not reconnect.
#[derive(Clone, Debug, Default)]
pub struct KillHandle(Arc<AtomicBool>);

impl KillHandle {
    /// Request shutdown.
    pub fn kill(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown was requested.
    pub fn is_killed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State and protocol logic for one IRC identity.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    nick: String,
    nick_retries: u32,
    state: ConnectionState,
    registry: Registry,
    isupport: Isupport,
    flood: FloodControl,
    codec: LineCodec,
    recv: BytesMut,
    outbox: VecDeque<Message>,
    wire: BytesMut,
    kill: KillHandle,
    started_at: DateTime<Utc>,
    session_started_at: Option<DateTime<Utc>>,
    last_activity: Instant,
    last_idle: Instant,
    ping_sent: Option<Instant>,
}

impl Session {
    /// A disconnected session.
    pub fn new(config: SessionConfig) -> Session {
        let now = Instant::now();
        Session {
            nick: config.nickname.clone(),
            nick_retries: 0,
            flood: FloodControl::new_at(&config.flood, now),
            config,
            state: ConnectionState::Disconnected,
            registry: Registry::new(),
            isupport: Isupport::new(),
            codec: LineCodec::new(),
            recv: BytesMut::new(),
            outbox: VecDeque::new(),
            wire: BytesMut::new(),
            kill: KillHandle::default(),
            started_at: Utc::now(),
            session_started_at: None,
            last_activity: now,
            last_idle: now,
            ping_sent: None,
        }
    }

    /// The configuration this session was built from.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Our current nickname.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Channel state.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// All joined channels.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.registry.channels()
    }

    /// A joined channel, looked up case-insensitively.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.registry.get_channel(name)
    }

    /// The server's advertised capabilities.
    pub fn isupport(&self) -> &Isupport {
        &self.isupport
    }

    /// Outbound flood control.
    pub fn flood(&self) -> &FloodControl {
        &self.flood
    }

    /// Messages waiting in the flood queue.
    pub fn queued(&self) -> usize {
        self.flood.queued()
    }

    /// When this session object was created.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the current (or last) connection was established.
    pub fn session_started_at(&self) -> Option<DateTime<Utc>> {
        self.session_started_at
    }

    /// When bytes last arrived from the server.
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// A handle that can stop this session from elsewhere.
    pub fn kill_handle(&self) -> KillHandle {
        self.kill.clone()
    }

    /// Stop after the current iteration and do not reconnect.
    pub fn kill(&self) {
        self.kill.kill();
    }

    /// Whether [`Session::kill`] was called.
    pub fn is_killed(&self) -> bool {
        self.kill.is_killed()
    }

    /// Note that a connection attempt is starting.
    pub fn connecting(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// A transport is up: reset per-connection buffers and log in.
    ///
    /// `PASS` (if configured), `NICK` and `USER` bypass the filter and the
    /// flood limiter.
    pub fn connected(&mut self, now: Instant) {
        self.state = ConnectionState::LoggingIn;
        self.nick = self.config.nickname.clone();
        self.nick_retries = 0;
        self.session_started_at = Some(Utc::now());
        self.last_activity = now;
        self.last_idle = now;
        self.ping_sent = None;
        self.recv.clear();
        self.codec.reset();

        if let Some(password) = self.config.password.clone() {
            self.send_immediate(Message::pass(&password));
        }
        let nick = Message::nick(&self.nick);
        let user = Message::user(&self.config.username, &self.config.realname);
        self.send_immediate(nick);
        self.send_immediate(user);
    }

    /// The connection dropped: notify the handler, then forget every
    /// channel, capability and pending outbound byte.
    pub fn disconnected<H: Handler>(&mut self, handler: &mut H) {
        self.state = ConnectionState::Disconnected;
        self.emit(handler, Event::Disconnect);

        self.registry.clear();
        self.isupport.clear();
        self.flood.clear();
        self.outbox.clear();
        self.wire.clear();
        self.recv.clear();
        self.codec.reset();
        self.ping_sent = None;
    }

    /// Feed bytes read from the server and dispatch every complete line.
    pub fn receive<H: Handler>(&mut self, bytes: &[u8], now: Instant, handler: &mut H) {
        self.last_activity = now;
        self.ping_sent = None;
        self.recv.extend_from_slice(bytes);

        while let Some(line) = self.codec.decode_line(&mut self.recv) {
            self.handle_line(&line, handler);
        }
    }

    /// Parse and dispatch one line. Unparsable lines are logged and skipped.
    pub fn handle_line<H: Handler>(&mut self, line: &str, handler: &mut H) {
        debug!("<< {}", line);
        match line.parse::<Message>() {
            Ok(msg) => self.handle_message(msg, handler),
            Err(err) => warn!(%err, "skipping unparsable line"),
        }
    }

    /// Called when a read timed out. Pings a silent server, and fails once
    /// a ping has gone unanswered for a whole liveness interval.
    pub fn check_liveness(&mut self, now: Instant) -> Result<(), SessionError> {
        let timeout = self.config.liveness_timeout;
        let silent = now.saturating_duration_since(self.last_activity);

        match self.ping_sent {
            Some(sent) if now.saturating_duration_since(sent) >= timeout => {
                Err(SessionError::PingTimeout(silent))
            }
            Some(_) => Ok(()),
            None if silent >= timeout => {
                info!(
                    silent_secs = silent.as_secs(),
                    "no sign of life from server, pinging"
                );
                let ping = Message::ping(&self.config.server);
                self.send_immediate(ping);
                self.ping_sent = Some(now);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Periodic work: drain the flood queue and the outbox, fire the idle
    /// event when due, and refill the token bucket.
    pub fn tick<H: Handler>(&mut self, now: Instant, handler: &mut H) {
        self.flush_outbound(now, handler);

        if now.saturating_duration_since(self.last_idle) >= self.config.idle_interval {
            let last = self.last_idle;
            self.last_idle = now;
            self.emit(handler, Event::Idle { last });
        }

        self.flood.refill_at(now);
    }

    /// Bytes encoded and ready to be written.
    pub fn has_wire(&self) -> bool {
        !self.wire.is_empty()
    }

    /// Take every byte encoded so far.
    pub fn take_wire(&mut self) -> BytesMut {
        self.wire.split()
    }

    /// Time until the next idle tick is due.
    pub fn until_idle(&self, now: Instant) -> Duration {
        self.config
            .idle_interval
            .saturating_sub(now.saturating_duration_since(self.last_idle))
    }

    fn emit<H: Handler>(&mut self, handler: &mut H, event: Event) {
        handler.on_event(self, &event);
    }
}
