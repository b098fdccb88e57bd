//! Fuzz target for inbound line framing
//!
//! Splits the input into chunks as a socket might deliver them and runs
//! every decoded line through the session dispatcher.

#![no_main]

use std::time::Instant;

use libfuzzer_sys::fuzz_target;
use slirc_session::{Event, Session, SessionConfig};

fuzz_target!(|data: &[u8]| {
    let mut session = Session::new(SessionConfig::new("irc.example.org", 6667, "fuzz"));
    let mut handler = |_: &mut Session, _: &Event| {};
    session.connected(Instant::now());

    for chunk in data.chunks(97) {
        session.receive(chunk, Instant::now(), &mut handler);
    }
    session.tick(Instant::now(), &mut handler);
});
