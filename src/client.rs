//! The tokio driver: connect, log in, pump bytes through the [`Session`],
//! reconnect.
//!
//! # Example
//!
//! ```no_run
//! use slirc_session::{Client, Event, Session, SessionConfig};
//!
//! # async fn run() -> Result<(), slirc_session::error::SessionError> {
//! let config = SessionConfig::new("irc.libera.chat", 6667, "slirc-bot");
//! let handler = |session: &mut Session, event: &Event| {
//!     if let Event::Connect = event {
//!         session.join("#slirc", None);
//!     }
//! };
//! Client::new(config, handler).run().await
//! # }
//! ```

use std::time::{Duration, Instant};

use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::event::Handler;
use crate::line::RECV_BUFFER_MAX;
use crate::session::{KillHandle, Session};
use crate::state::ConnectionState;
use crate::transport::Transport;

/// Readiness wait between loop iterations.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// A [`Session`] bound to a handler and a reconnecting TCP loop.
#[derive(Debug)]
pub struct Client<H> {
    session: Session,
    handler: H,
}

impl<H: Handler> Client<H> {
    /// Build a client; nothing happens until [`Client::run`].
    pub fn new(config: SessionConfig, handler: H) -> Client<H> {
        Client {
            session: Session::new(config),
            handler,
        }
    }

    /// A handle that stops [`Client::run`] from another task.
    pub fn kill_handle(&self) -> KillHandle {
        self.session.kill_handle()
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Give the handler back.
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Connect and run until killed or the reconnect policy gives up.
    ///
    /// Returns `Ok(())` after [`Session::kill`].
    pub async fn run(&mut self) -> Result<(), SessionError> {
        let span = info_span!(
            "irc_session",
            server = %self.session.config().server,
            port = self.session.config().port
        );
        self.run_loop().instrument(span).await
    }

    async fn run_loop(&mut self) -> Result<(), SessionError> {
        let mut failures: u32 = 0;

        while !self.session.is_killed() {
            let (server, port, connect_timeout) = {
                let config = self.session.config();
                (config.server.clone(), config.port, config.connect_timeout)
            };

            self.session.connecting();
            info!("connecting");
            let outcome = match Transport::connect(&server, port, connect_timeout).await {
                Ok(mut transport) => {
                    let outcome = self.drive(&mut transport).await;
                    if let Err(err) = transport.shutdown().await {
                        debug!(%err, "shutdown after disconnect failed");
                    }
                    outcome
                }
                Err(err) => Err(err),
            };

            let registered = self.session.state() == ConnectionState::Active;
            match &outcome {
                Ok(()) => info!("connection closed"),
                Err(err) => error!(%err, "connection lost"),
            }
            // every attempt ends in a Disconnect, failed connects included
            self.session.disconnected(&mut self.handler);

            if self.session.is_killed() {
                break;
            }

            failures = if registered { 1 } else { failures.saturating_add(1) };
            let policy = self.session.config().reconnect;
            if !policy.allows(failures) {
                warn!(failures, "reconnect attempts exhausted");
                return Err(SessionError::ReconnectExhausted(failures));
            }
            let delay = policy.delay_for(failures);
            if !delay.is_zero() {
                info!(delay_ms = delay.as_millis() as u64, "reconnecting after delay");
                sleep(delay).await;
            }
        }

        info!("session killed");
        Ok(())
    }

    /// One connection: log in, then read, check liveness and tick until
    /// the connection ends or the session is killed.
    async fn drive(&mut self, transport: &mut Transport) -> Result<(), SessionError> {
        self.session.connected(Instant::now());
        let mut buf = vec![0u8; RECV_BUFFER_MAX];

        loop {
            self.flush(transport).await?;
            if self.session.is_killed() {
                return Ok(());
            }

            match timeout(READ_TIMEOUT, transport.read(&mut buf)).await {
                Ok(Ok(0)) => return Ok(()),
                Ok(Ok(n)) => self.session.receive(&buf[..n], Instant::now(), &mut self.handler),
                Ok(Err(err)) => return Err(SessionError::Io(err)),
                Err(_) => {
                    self.session.check_liveness(Instant::now())?;
                }
            }

            self.session.tick(Instant::now(), &mut self.handler);
        }
    }

    async fn flush(&mut self, transport: &mut Transport) -> Result<(), SessionError> {
        if self.session.has_wire() {
            let wire = self.session.take_wire();
            transport.write_all(&wire).await?;
        }
        Ok(())
    }
}
