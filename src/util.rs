//! Small helpers shared by the codec and the registry.

/// Maximum length of an IRC line, terminator included.
pub const MAX_MESSAGE_LEN: usize = 512;

/// Maximum length of a line's content once CRLF is accounted for.
pub const MAX_LINE_CONTENT: usize = MAX_MESSAGE_LEN - 2;

/// Maximum number of parameters (middle plus trailing) in one message.
pub const MAX_PARAMS: usize = 15;

/// Truncates a string to at most `max_bytes` bytes without breaking
/// a multi-byte UTF-8 codepoint at the end.
///
/// # Examples
///
/// ```
/// use slirc_session::util::truncate_utf8_safe;
///
/// assert_eq!(truncate_utf8_safe("hello world", 5), "hello");
/// assert_eq!(truncate_utf8_safe("Hello 👋 World", 8), "Hello ");
/// assert_eq!(truncate_utf8_safe("hi", 10), "hi");
/// ```
#[inline]
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Case-insensitive wildcard match of `text` against `pattern`.
///
/// `*` matches any run of characters (including none), `?` matches exactly
/// one. Used for matching hostmasks such as `*!*@*.example.org` against
/// full user prefixes.
///
/// ```
/// use slirc_session::util::wildcard_match;
///
/// assert!(wildcard_match("alice!a@host.example.org", "*!*@*.example.org"));
/// assert!(wildcard_match("Bob!b@h", "b?b!*"));
/// assert!(!wildcard_match("carol!c@h", "alice!*"));
/// ```
pub fn wildcard_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();

    let (mut t, mut p) = (0, 0);
    // Position of the last `*` seen and the text index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, tried)) => {
                    p = star + 1;
                    t = tried + 1;
                    backtrack = Some((star, tried + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
