//! ISUPPORT (numeric 005) capability table.
//!
//! Servers advertise their protocol parameters as `KEY[=VALUE]` tokens,
//! possibly spread across several 005 lines. [`Isupport`] accumulates them
//! for the lifetime of a connection and keeps a precomputed [`ModeClass`]
//! lookup derived from `CHANMODES` and `PREFIX`, so the mode interpreter
//! classifies each letter with a single map lookup.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::CapabilityError;

/// How a channel mode letter uses positional arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModeClass {
    /// `CHANMODES` group A: a list (bans, exceptions); always takes an argument.
    List,
    /// `CHANMODES` group B: a single value that always takes an argument.
    AlwaysArg,
    /// `CHANMODES` group C: takes an argument only when set.
    ArgOnSet,
    /// `CHANMODES` group D: a flag without argument.
    NoArg,
    /// A `PREFIX` letter granting a per-user privilege; takes a nickname.
    Privilege {
        /// Zero is the highest rank.
        rank: usize,
        /// The roster symbol, e.g. `@` for `o`.
        symbol: char,
    },
}

impl ModeClass {
    /// Whether a change with the given sign consumes a positional argument.
    pub fn takes_arg(self, set: bool) -> bool {
        match self {
            ModeClass::List | ModeClass::AlwaysArg | ModeClass::Privilege { .. } => true,
            ModeClass::ArgOnSet => set,
            ModeClass::NoArg => false,
        }
    }
}

/// The four `CHANMODES` groups, borrowed from the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChanModes<'a> {
    /// Group A: list modes.
    pub a: &'a str,
    /// Group B: always take an argument.
    pub b: &'a str,
    /// Group C: take an argument only when set.
    pub c: &'a str,
    /// Group D: never take an argument.
    pub d: &'a str,
}

impl<'a> ChanModes<'a> {
    /// Split a `CHANMODES` value. Groups beyond the fourth are folded into D.
    pub fn parse(s: &'a str) -> Option<Self> {
        let mut parts = s.splitn(4, ',');
        let (a, b, c, d) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        Some(ChanModes { a, b, c, d })
    }
}

/// A parsed `PREFIX=(modes)symbols` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefixSpec<'a> {
    /// Privilege mode letters, highest rank first.
    pub modes: &'a str,
    /// Matching roster symbols.
    pub prefixes: &'a str,
}

impl<'a> PrefixSpec<'a> {
    /// Parse `(ov)@+`. Returns `None` unless both halves are present.
    pub fn parse(s: &'a str) -> Option<Self> {
        let rest = s.strip_prefix('(')?;
        let (modes, prefixes) = rest.split_once(')')?;
        if modes.is_empty() || prefixes.is_empty() {
            return None;
        }
        Some(PrefixSpec { modes, prefixes })
    }

    /// Letters paired positionally with symbols; unpaired extras are dropped.
    pub fn pairs(&self) -> impl Iterator<Item = (char, char)> + 'a {
        self.modes.chars().zip(self.prefixes.chars())
    }
}

/// The negotiated capability table for one connection.
#[derive(Clone, Debug, Default)]
pub struct Isupport {
    entries: HashMap<String, Option<String>>,
    privileges: Vec<(char, char)>,
    classes: HashMap<char, ModeClass>,
}

impl Isupport {
    /// An empty table.
    pub fn new() -> Isupport {
        Isupport::default()
    }

    /// Forget everything, as on disconnect.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.privileges.clear();
        self.classes.clear();
    }

    /// Number of advertised keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been advertised yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ingest the tokens of one 005 line (the parameters after our own nick).
    ///
    /// `KEY=VALUE` and bare `KEY` tokens are stored; `-KEY` withdraws a key
    /// advertised earlier. Keys compare case-insensitively.
    pub fn ingest<'t, I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = &'t str>,
    {
        let mut reclassify = false;
        for token in tokens {
            if token.is_empty() || token.contains(' ') {
                continue;
            }
            if let Some(key) = token.strip_prefix('-') {
                let key = key.to_ascii_uppercase();
                debug!(key = %key, "capability withdrawn");
                reclassify |= affects_modes(&key);
                self.entries.remove(&key);
                continue;
            }

            let (key, value) = match token.split_once('=') {
                Some((key, value)) => (key, Some(value.to_owned())),
                None => (token, None),
            };
            let key = key.to_ascii_uppercase();
            debug!(key = %key, value = ?value, "capability");
            reclassify |= affects_modes(&key);
            self.entries.insert(key, value);
        }

        if reclassify {
            self.rebuild_classes();
        }
    }

    /// `Some(value)` if the key was advertised; the inner option is its value.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries
            .get(&key.to_ascii_uppercase())
            .map(|v| v.as_deref())
    }

    /// Value of an advertised key, if it carried one.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).flatten()
    }

    /// Whether the key was advertised at all.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All advertised keys and values, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// The four `CHANMODES` groups.
    pub fn chanmodes_groups(&self) -> Result<ChanModes<'_>, CapabilityError> {
        let raw = self
            .value("CHANMODES")
            .ok_or(CapabilityError::Missing("CHANMODES"))?;
        ChanModes::parse(raw).ok_or_else(|| CapabilityError::Malformed {
            key: "CHANMODES",
            value: raw.to_owned(),
        })
    }

    /// The parsed `PREFIX` value.
    pub fn prefix(&self) -> Option<PrefixSpec<'_>> {
        self.value("PREFIX").and_then(PrefixSpec::parse)
    }

    /// `(mode letter, symbol)` pairs from `PREFIX`, highest rank first.
    pub fn privilege_letters(&self) -> &[(char, char)] {
        &self.privileges
    }

    /// Classification of a channel mode letter, if any capability names it.
    pub fn classify(&self, mode: char) -> Option<ModeClass> {
        self.classes.get(&mode).copied()
    }

    /// Whether `mode` is a per-user privilege letter.
    pub fn is_privilege(&self, mode: char) -> bool {
        matches!(self.classify(mode), Some(ModeClass::Privilege { .. }))
    }

    /// The privilege letter shown as `symbol` in rosters (`@` -> `o`).
    pub fn privilege_for_symbol(&self, symbol: char) -> Option<char> {
        self.privileges
            .iter()
            .find(|&&(_, s)| s == symbol)
            .map(|&(m, _)| m)
    }

    /// The roster symbol for a privilege letter (`o` -> `@`).
    pub fn symbol_for_privilege(&self, mode: char) -> Option<char> {
        self.privileges
            .iter()
            .find(|&&(m, _)| m == mode)
            .map(|&(_, s)| s)
    }

    /// `NETWORK` name.
    pub fn network(&self) -> Option<&str> {
        self.value("NETWORK")
    }

    /// `CASEMAPPING` name.
    pub fn casemapping(&self) -> Option<&str> {
        self.value("CASEMAPPING")
    }

    /// `CHANTYPES` characters.
    pub fn chantypes(&self) -> Option<&str> {
        self.value("CHANTYPES")
    }

    /// Ban-exception list mode, `e` unless `EXCEPTS` names another letter.
    pub fn excepts_mode(&self) -> Option<char> {
        self.get("EXCEPTS")
            .map(|v| v.and_then(|s| s.chars().next()).unwrap_or('e'))
    }

    /// Invite-exception list mode, `I` unless `INVEX` names another letter.
    pub fn invex_mode(&self) -> Option<char> {
        self.get("INVEX")
            .map(|v| v.and_then(|s| s.chars().next()).unwrap_or('I'))
    }

    fn rebuild_classes(&mut self) {
        let mut classes = HashMap::new();

        match self.chanmodes_groups() {
            Ok(groups) => {
                let grouped = [
                    (groups.a, ModeClass::List),
                    (groups.b, ModeClass::AlwaysArg),
                    (groups.c, ModeClass::ArgOnSet),
                    (groups.d, ModeClass::NoArg),
                ];
                for (letters, class) in grouped {
                    for letter in letters.chars().filter(|c| *c != ',') {
                        classes.insert(letter, class);
                    }
                }
            }
            Err(err) => debug!(%err, "no channel mode groups yet"),
        }

        let privileges: Vec<(char, char)> = match self.prefix() {
            Some(spec) => spec.pairs().collect(),
            None => {
                if let Some(raw) = self.value("PREFIX") {
                    warn!(value = %raw, "ignoring malformed PREFIX");
                }
                Vec::new()
            }
        };
        for (rank, &(letter, symbol)) in privileges.iter().enumerate() {
            classes.insert(letter, ModeClass::Privilege { rank, symbol });
        }

        self.classes = classes;
        self.privileges = privileges;
    }
}

fn affects_modes(key: &str) -> bool {
    key == "CHANMODES" || key == "PREFIX"
}
