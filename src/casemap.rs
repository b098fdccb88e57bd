//! IRC case-mapping functions.
//!
//! Channel names and nicknames compare case-insensitively under the
//! `rfc1459` mapping, where `[]\~` are the lowercase forms of `{}|^`.
//! The registry keys channels by [`irc_to_lower`] so lookups are
//! independent of the case the server happens to echo back.

#[inline]
fn fold(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        _ => c.to_ascii_lowercase(),
    }
}

/// Convert a string to IRC lowercase using RFC 1459 case mapping.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(fold).collect()
}

/// Compare two strings using IRC case-insensitive comparison.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.chars().zip(b.chars()).all(|(x, y)| fold(x) == fold(y))
}
