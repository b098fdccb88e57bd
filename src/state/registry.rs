use std::collections::HashMap;

use tracing::{debug, warn};

use crate::casemap::irc_to_lower;

use super::{Channel, User};

/// Joined channels keyed by case-folded name.
///
/// Operations naming a channel that is not tracked log a warning and change
/// nothing.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    channels: HashMap<String, Channel>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Number of tracked channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channel is tracked.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Forget every channel.
    pub fn clear(&mut self) {
        self.channels.clear();
    }

    /// Start tracking a channel, or return the existing record.
    pub fn add_channel(&mut self, name: &str) -> &mut Channel {
        let key = irc_to_lower(name);
        if self.channels.contains_key(&key) {
            warn!(channel = %name, "channel already tracked");
        } else {
            debug!(channel = %name, "channel added");
        }
        self.channels
            .entry(key)
            .or_insert_with(|| Channel::new(name))
    }

    /// Stop tracking a channel.
    pub fn remove_channel(&mut self, name: &str) -> Option<Channel> {
        let removed = self.channels.remove(&irc_to_lower(name));
        match removed {
            Some(_) => debug!(channel = %name, "channel removed"),
            None => warn!(channel = %name, "cannot remove unknown channel"),
        }
        removed
    }

    /// Case-insensitive channel lookup.
    pub fn get_channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&irc_to_lower(name))
    }

    /// Mutable channel lookup; warns when the channel is not tracked.
    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        let channel = self.channels.get_mut(&irc_to_lower(name));
        if channel.is_none() {
            warn!(channel = %name, "unknown channel");
        }
        channel
    }

    /// All tracked channels, in no particular order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Add a member to a channel.
    pub fn add_user(&mut self, channel: &str, prefix: &str) -> bool {
        self.channel_mut(channel)
            .map_or(false, |chan| chan.add_user(prefix))
    }

    /// Remove a member from a channel.
    pub fn remove_user(&mut self, channel: &str, nick_or_prefix: &str) -> Option<User> {
        self.channel_mut(channel)?.remove_user(nick_or_prefix)
    }

    /// Look a member up by full prefix or nickname.
    pub fn find_user(&self, channel: &str, nick_or_prefix: &str) -> Option<&User> {
        self.get_channel(channel)?.find_user(nick_or_prefix)
    }

    /// Rename a member in one channel, keeping their privileges.
    pub fn rename_user(&mut self, channel: &str, old_prefix: &str, new_prefix: &str) -> bool {
        self.channel_mut(channel)
            .map_or(false, |chan| chan.rename_user(old_prefix, new_prefix))
    }

    /// Rename a member in every channel they are in. Returns the affected
    /// channel names.
    pub fn rename_everywhere(&mut self, old_prefix: &str, new_prefix: &str) -> Vec<String> {
        self.channels
            .values_mut()
            .filter(|chan| chan.find_user(old_prefix).is_some())
            .filter_map(|chan| {
                chan.rename_user(old_prefix, new_prefix)
                    .then(|| chan.name().to_owned())
            })
            .collect()
    }

    /// Remove a member from every channel they are in. Returns the affected
    /// channel names.
    pub fn remove_everywhere(&mut self, nick_or_prefix: &str) -> Vec<String> {
        self.channels
            .values_mut()
            .filter(|chan| chan.find_user(nick_or_prefix).is_some())
            .filter_map(|chan| {
                chan.remove_user(nick_or_prefix)
                    .map(|_| chan.name().to_owned())
            })
            .collect()
    }
}
