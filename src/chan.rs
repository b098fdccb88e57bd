//! Channel name helpers.

/// Channel-name prefixes recognised by RFC 2811.
pub const CHANNEL_PREFIXES: &[char] = &['#', '&', '+', '!'];

/// An extension trait for telling channel names apart from nicknames.
pub trait ChannelExt {
    /// Returns true if this string names a channel.
    fn is_channel_name(&self) -> bool;
}

impl ChannelExt for str {
    fn is_channel_name(&self) -> bool {
        self.starts_with(CHANNEL_PREFIXES)
    }
}

impl ChannelExt for String {
    fn is_channel_name(&self) -> bool {
        self.as_str().is_channel_name()
    }
}

/// Pick where a reply to a message should go.
///
/// A message sent to a channel is answered in that channel; a private
/// message is answered to its sender.
///
/// ```
/// use slirc_session::chan::proper_target;
///
/// assert_eq!(proper_target("#rust", "alice"), "#rust");
/// assert_eq!(proper_target("mybot", "alice"), "alice");
/// ```
pub fn proper_target<'a>(target: &'a str, sender: &'a str) -> &'a str {
    if target.is_channel_name() {
        target
    } else {
        sender
    }
}
