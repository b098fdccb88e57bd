//! Session configuration.
//!
//! Plain structs with defaults matching common IRC network policies. With
//! the `serde` feature they can be deserialized from whatever format the
//! host application uses; this crate does not load files itself.

use std::time::Duration;

/// Everything a session needs to connect and register.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    /// Server host name or address.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Desired nickname.
    pub nickname: String,
    /// Username (ident).
    pub username: String,
    /// Real name / GECOS.
    pub realname: String,
    /// Server password, sent as `PASS` before registration.
    pub password: Option<String>,
    /// Outbound flood control.
    pub flood: FloodConfig,
    /// Silence after which the server is pinged.
    pub liveness_timeout: Duration,
    /// Interval between idle ticks.
    pub idle_interval: Duration,
    /// Upper bound on a single connect attempt.
    pub connect_timeout: Duration,
    /// Delay policy between connection attempts.
    pub reconnect: ReconnectPolicy,
}

impl SessionConfig {
    /// A configuration with defaults; username and realname follow the nickname.
    pub fn new(server: &str, port: u16, nickname: &str) -> SessionConfig {
        SessionConfig {
            server: server.to_owned(),
            port,
            nickname: nickname.to_owned(),
            username: nickname.to_owned(),
            realname: nickname.to_owned(),
            password: None,
            flood: FloodConfig::default(),
            liveness_timeout: Duration::from_secs(120),
            idle_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(30),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Token bucket parameters for outbound traffic.
///
/// Units are bytes on the wire; `fill_rate` is bytes per second.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FloodConfig {
    /// Bucket size.
    pub capacity: u32,
    /// Refill rate, per second.
    pub fill_rate: u32,
    /// Smallest charge for a single message.
    pub min_charge: u32,
    /// Slots in the outbound ring; one is always kept free.
    pub queue_slots: usize,
}

impl Default for FloodConfig {
    fn default() -> Self {
        FloodConfig {
            capacity: 512,
            fill_rate: 64,
            min_charge: 96,
            queue_slots: 32,
        }
    }
}

impl FloodConfig {
    /// Messages the queue can hold before new ones are dropped.
    pub fn usable_slots(&self) -> usize {
        self.queue_slots.saturating_sub(1)
    }
}

/// Exponential backoff between connection attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReconnectPolicy {
    /// Delay after the first failure. `Duration::ZERO` reconnects at once.
    pub initial_delay: Duration,
    /// Ceiling for the doubled delay.
    pub max_delay: Duration,
    /// Consecutive failures tolerated before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Reconnect immediately, forever.
    pub fn immediate() -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_attempts: None,
        }
    }

    /// Delay before reconnecting after `failures` consecutive failures
    /// (counting from 1).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// Whether another attempt is allowed after `failures` consecutive failures.
    pub fn allows(&self, failures: u32) -> bool {
        self.max_attempts.map_or(true, |max| failures < max)
    }
}
