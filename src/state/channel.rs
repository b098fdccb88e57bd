use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::prefix::{nick_of, same_nick};
use crate::util::wildcard_match;

/// The current value of one channel mode.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModeValue {
    /// A list mode's entries, in the order they were added.
    List(Vec<String>),
    /// A mode carrying one argument, such as a key or limit.
    Single(String),
    /// A flag without argument.
    Simple,
}

/// A channel member as seen from one channel.
///
/// The same person in two channels is two `User` records, each with its own
/// privilege set.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    prefix: String,
    privileges: BTreeSet<char>,
}

impl User {
    pub(crate) fn new(prefix: &str) -> User {
        User {
            prefix: prefix.to_owned(),
            privileges: BTreeSet::new(),
        }
    }

    /// Full `nick!user@host` prefix (or bare nick when nothing more is known).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Nickname part of the prefix.
    pub fn nick(&self) -> &str {
        nick_of(&self.prefix)
    }

    /// Privilege letters held in this channel.
    pub fn privileges(&self) -> impl Iterator<Item = char> + '_ {
        self.privileges.iter().copied()
    }

    /// Whether the privilege letter is held.
    pub fn has_privilege(&self, mode: char) -> bool {
        self.privileges.contains(&mode)
    }

    pub(crate) fn grant(&mut self, mode: char) {
        self.privileges.insert(mode);
    }

    pub(crate) fn revoke(&mut self, mode: char) -> bool {
        self.privileges.remove(&mode)
    }
}

/// A joined channel: topic, modes and roster.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Channel {
    name: String,
    created: DateTime<Utc>,
    topic: Option<String>,
    topic_setter: Option<String>,
    topic_time: Option<DateTime<Utc>>,
    modes: HashMap<char, ModeValue>,
    users: HashMap<String, User>,
}

impl Channel {
    /// A channel with no known topic, modes or members.
    pub fn new(name: &str) -> Channel {
        Channel {
            name: name.to_owned(),
            created: Utc::now(),
            topic: None,
            topic_setter: None,
            topic_time: None,
            modes: HashMap::new(),
            users: HashMap::new(),
        }
    }

    /// Name as first seen.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation time; the local join time until the server reports one.
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Current topic.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Who set the current topic.
    pub fn topic_setter(&self) -> Option<&str> {
        self.topic_setter.as_deref()
    }

    /// When the current topic was set.
    pub fn topic_time(&self) -> Option<DateTime<Utc>> {
        self.topic_time
    }

    pub(crate) fn set_created(&mut self, created: DateTime<Utc>) {
        self.created = created;
    }

    pub(crate) fn set_topic(&mut self, topic: &str) {
        self.topic = Some(topic.to_owned());
    }

    pub(crate) fn set_topic_meta(&mut self, setter: &str, time: Option<DateTime<Utc>>) {
        self.topic_setter = Some(setter.to_owned());
        self.topic_time = time;
    }

    /// Number of known members.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// All known members, in no particular order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Members whose full prefix matches a wildcard mask.
    pub fn users_matching<'a>(&'a self, mask: &'a str) -> impl Iterator<Item = &'a User> + 'a {
        self.users
            .values()
            .filter(move |u| wildcard_match(&u.prefix, mask))
    }

    fn user_key(&self, nick_or_prefix: &str) -> Option<String> {
        if self.users.contains_key(nick_or_prefix) {
            return Some(nick_or_prefix.to_owned());
        }
        self.users
            .keys()
            .find(|k| same_nick(k, nick_or_prefix))
            .cloned()
    }

    /// Look a member up by full prefix or, failing that, by nickname.
    pub fn find_user(&self, nick_or_prefix: &str) -> Option<&User> {
        let key = self.user_key(nick_or_prefix)?;
        self.users.get(&key)
    }

    pub(crate) fn find_user_mut(&mut self, nick_or_prefix: &str) -> Option<&mut User> {
        let key = self.user_key(nick_or_prefix)?;
        self.users.get_mut(&key)
    }

    /// Add a member. An already present prefix is left alone.
    pub(crate) fn add_user(&mut self, prefix: &str) -> bool {
        if self.users.contains_key(prefix) {
            warn!(channel = %self.name, user = %prefix, "user already in channel");
            return false;
        }
        debug!(channel = %self.name, user = %prefix, "user added");
        self.users.insert(prefix.to_owned(), User::new(prefix));
        true
    }

    /// Remove a member by prefix or nickname.
    pub(crate) fn remove_user(&mut self, nick_or_prefix: &str) -> Option<User> {
        let Some(key) = self.user_key(nick_or_prefix) else {
            warn!(channel = %self.name, user = %nick_or_prefix, "cannot remove unknown user");
            return None;
        };
        debug!(channel = %self.name, user = %key, "user removed");
        self.users.remove(&key)
    }

    /// Replace a member's prefix, keeping their privileges.
    pub(crate) fn rename_user(&mut self, old: &str, new: &str) -> bool {
        let Some(key) = self.user_key(old) else {
            warn!(channel = %self.name, user = %old, "cannot rename unknown user");
            return false;
        };
        let Some(mut user) = self.users.remove(&key) else {
            return false;
        };
        user.prefix = new.to_owned();
        self.users.insert(new.to_owned(), user);
        true
    }

    /// Current value of a mode letter.
    pub fn mode(&self, mode: char) -> Option<&ModeValue> {
        self.modes.get(&mode)
    }

    /// Whether the mode is set in any form.
    pub fn has_mode(&self, mode: char) -> bool {
        self.modes.contains_key(&mode)
    }

    /// All set modes, in no particular order.
    pub fn modes(&self) -> impl Iterator<Item = (char, &ModeValue)> {
        self.modes.iter().map(|(c, v)| (*c, v))
    }

    /// Entries of a list mode; empty if unset.
    pub fn list(&self, mode: char) -> &[String] {
        match self.modes.get(&mode) {
            Some(ModeValue::List(entries)) => entries,
            _ => &[],
        }
    }

    pub(crate) fn add_list_entry(&mut self, mode: char, entry: &str) {
        match self.modes.get_mut(&mode) {
            Some(ModeValue::List(entries)) => {
                if entries.iter().any(|e| e == entry) {
                    debug!(channel = %self.name, %mode, %entry, "list entry already present");
                } else {
                    entries.push(entry.to_owned());
                }
            }
            _ => {
                self.modes
                    .insert(mode, ModeValue::List(vec![entry.to_owned()]));
            }
        }
    }

    pub(crate) fn set_single(&mut self, mode: char, value: &str) {
        self.modes.insert(mode, ModeValue::Single(value.to_owned()));
    }

    pub(crate) fn set_simple(&mut self, mode: char) {
        self.modes.insert(mode, ModeValue::Simple);
    }

    /// Remove a list entry, dropping the mode once its list is empty.
    pub(crate) fn remove_list_entry(&mut self, mode: char, entry: &str) -> bool {
        let Some(ModeValue::List(entries)) = self.modes.get_mut(&mode) else {
            warn!(channel = %self.name, %mode, "cannot unset list mode that is not set");
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e != entry);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.modes.remove(&mode);
        }
        if !removed {
            warn!(channel = %self.name, %mode, %entry, "list entry not present");
        }
        removed
    }

    /// Remove a single-value or simple mode.
    pub(crate) fn unset_mode(&mut self, mode: char) -> bool {
        if self.modes.remove(&mode).is_none() {
            warn!(channel = %self.name, %mode, "cannot unset mode that is not set");
            return false;
        }
        true
    }
}

/// Parse a Unix timestamp as sent in 329 and 333 replies.
pub(crate) fn parse_unix_time(raw: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = raw.parse().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}
