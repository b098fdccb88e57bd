//! Outbound flood control.
//!
//! A [`TokenBucket`] meters bytes on the wire. [`FloodControl`] puts a
//! bounded FIFO in front of it: a message is sent at once only while the
//! queue is empty and the bucket can pay for it, otherwise it waits its
//! turn. When the queue is full, new messages are dropped.
//!
//! Every time-dependent operation has an `_at` variant taking an explicit
//! [`Instant`] so the behaviour can be driven deterministically.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{debug, warn};

use crate::config::FloodConfig;
use crate::message::Message;
use crate::util::MAX_MESSAGE_LEN;

/// A lazily refilled token bucket.
#[derive(Clone, Debug)]
pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    fill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A full bucket holding `capacity` tokens, refilling `fill_rate` per second.
    pub fn new(capacity: u32, fill_rate: u32) -> TokenBucket {
        TokenBucket::new_at(capacity, fill_rate, Instant::now())
    }

    /// Like [`TokenBucket::new`], starting the refill clock at `now`.
    pub fn new_at(capacity: u32, fill_rate: u32, now: Instant) -> TokenBucket {
        TokenBucket {
            tokens: f64::from(capacity),
            capacity: f64::from(capacity),
            fill_rate: f64::from(fill_rate),
            last_refill: now,
        }
    }

    /// Tokens currently available, as of the last refill.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Maximum number of tokens.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Add the tokens accrued since the last refill.
    pub fn refill(&mut self) {
        self.refill_at(Instant::now());
    }

    /// Add the tokens accrued between the last refill and `now`.
    pub fn refill_at(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + self.fill_rate * elapsed.as_secs_f64()).min(self.capacity);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    /// Take `n` tokens if available.
    pub fn consume(&mut self, n: u32) -> bool {
        self.consume_at(n, Instant::now())
    }

    /// Refill up to `now`, then take `n` tokens if available. A failed
    /// attempt leaves the balance untouched.
    pub fn consume_at(&mut self, n: u32, now: Instant) -> bool {
        self.refill_at(now);
        let n = f64::from(n);
        if n <= self.tokens {
            self.tokens -= n;
            true
        } else {
            false
        }
    }
}

/// Outcome of handing a message to [`FloodControl::submit_at`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Paid for; write it now.
    Send(Message),
    /// Waiting in the queue.
    Queued,
    /// The queue was full; the message is gone.
    Dropped,
}

/// Token bucket plus bounded outbound queue.
#[derive(Clone, Debug)]
pub struct FloodControl {
    bucket: TokenBucket,
    queue: VecDeque<Message>,
    limit: usize,
    min_charge: u32,
    capacity: u32,
}

impl FloodControl {
    /// Build from configuration, with a full bucket.
    pub fn new(config: &FloodConfig) -> FloodControl {
        FloodControl::new_at(config, Instant::now())
    }

    /// Like [`FloodControl::new`], starting the refill clock at `now`.
    pub fn new_at(config: &FloodConfig, now: Instant) -> FloodControl {
        let limit = config.usable_slots();
        FloodControl {
            bucket: TokenBucket::new_at(config.capacity, config.fill_rate, now),
            queue: VecDeque::with_capacity(limit),
            limit,
            min_charge: config.min_charge,
            capacity: config.capacity,
        }
    }

    /// The underlying bucket.
    pub fn bucket(&self) -> &TokenBucket {
        &self.bucket
    }

    /// Messages waiting to be sent.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Tokens charged for a message of `wire_len` bytes (terminator excluded).
    ///
    /// The charge covers the CRLF, never drops below the minimum charge and
    /// never exceeds the bucket capacity.
    pub fn charge_for(&self, wire_len: usize) -> u32 {
        let on_wire = (wire_len + 2).min(MAX_MESSAGE_LEN);
        let on_wire = u32::try_from(on_wire).unwrap_or(u32::MAX);
        on_wire.max(self.min_charge).min(self.capacity)
    }

    /// Offer a message for sending.
    pub fn submit(&mut self, msg: Message) -> Admission {
        self.submit_at(msg, Instant::now())
    }

    /// Offer a message for sending at `now`.
    pub fn submit_at(&mut self, msg: Message, now: Instant) -> Admission {
        if self.queue.is_empty() && self.bucket.consume_at(self.charge_for(msg.wire_len()), now) {
            return Admission::Send(msg);
        }

        if self.queue.len() >= self.limit {
            warn!(
                command = %msg.command,
                queued = self.queue.len(),
                "send queue full, dropping message"
            );
            return Admission::Dropped;
        }

        debug!(command = %msg.command, "message queued for later delivery");
        self.queue.push_back(msg);
        Admission::Queued
    }

    /// Pop the queue head if the bucket can now pay for it.
    pub fn pop_ready(&mut self) -> Option<Message> {
        self.pop_ready_at(Instant::now())
    }

    /// Pop the queue head if the bucket can pay for it at `now`.
    pub fn pop_ready_at(&mut self, now: Instant) -> Option<Message> {
        let charge = self.charge_for(self.queue.front()?.wire_len());
        if self.bucket.consume_at(charge, now) {
            self.queue.pop_front()
        } else {
            None
        }
    }

    /// Top up the bucket.
    pub fn refill_at(&mut self, now: Instant) {
        self.bucket.refill_at(now);
    }

    /// Drop every queued message.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
