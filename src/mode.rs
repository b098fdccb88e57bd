//! Channel mode-change interpretation.
//!
//! A mode change such as `+ov-b alice bob *!*@spam` is walked left to
//! right. Each letter is classified through the [`Isupport`] table, which
//! decides whether it consumes the next positional argument:
//!
//! | class            | consumes an argument |
//! |------------------|----------------------|
//! | list (A)         | always               |
//! | always-arg (B)   | always               |
//! | arg-on-set (C)   | only when setting    |
//! | no-arg (D)       | never                |
//! | privilege letter | always (a nickname)  |
//!
//! Letters no capability mentions are treated as no-arg flags. Running out
//! of arguments aborts the rest of the string; changes before that point
//! stay applied.

use tracing::{debug, warn};

use crate::error::ModeError;
use crate::isupport::{Isupport, ModeClass};
use crate::state::{Channel, Registry};

/// One classified mode letter with its argument, if it took one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeChange {
    /// `true` for `+`, `false` for `-`.
    pub set: bool,
    /// The mode letter.
    pub mode: char,
    /// How the letter was classified.
    pub class: ModeClass,
    /// The positional argument it consumed.
    pub arg: Option<String>,
}

impl ModeChange {
    /// `+` or `-`.
    pub fn sign(&self) -> char {
        if self.set {
            '+'
        } else {
            '-'
        }
    }
}

/// The result of walking a mode string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeApplication {
    /// Changes in order, up to the first failure.
    pub changes: Vec<ModeChange>,
    /// Positional arguments consumed.
    pub consumed: usize,
    /// `Err` if the string was cut short for lack of arguments.
    pub outcome: Result<(), ModeError>,
}

impl ModeApplication {
    /// Whether every letter was processed.
    pub fn is_complete(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Classify every letter of `modes` and pair it with its argument.
///
/// The sign starts as `+`. Nothing is mutated; see [`apply_mode_change`].
pub fn parse_mode_change<'a, I>(modes: &str, args: I, isupport: &Isupport) -> ModeApplication
where
    I: IntoIterator<Item = &'a str>,
{
    let mut args = args.into_iter();
    let mut set = true;
    let mut changes = Vec::new();
    let mut consumed = 0;

    for mode in modes.chars() {
        match mode {
            '+' => set = true,
            '-' => set = false,
            _ => {
                let class = isupport.classify(mode).unwrap_or_else(|| {
                    debug!(%mode, "unclassified mode letter, assuming no argument");
                    ModeClass::NoArg
                });

                let arg = if class.takes_arg(set) {
                    match args.next() {
                        Some(arg) => {
                            consumed += 1;
                            Some(arg.to_owned())
                        }
                        None => {
                            let sign = if set { '+' } else { '-' };
                            return ModeApplication {
                                changes,
                                consumed,
                                outcome: Err(ModeError::MissingArgument { sign, mode }),
                            };
                        }
                    }
                } else {
                    None
                };

                changes.push(ModeChange {
                    set,
                    mode,
                    class,
                    arg,
                });
            }
        }
    }

    ModeApplication {
        changes,
        consumed,
        outcome: Ok(()),
    }
}

/// Apply a mode change to a tracked channel.
///
/// Fails with [`ModeError::UnknownChannel`] without touching anything if the
/// channel is not tracked. Otherwise every change up to a missing argument
/// is applied and the returned [`ModeApplication`] records what happened.
pub fn apply_mode_change<'a, I>(
    registry: &mut Registry,
    isupport: &Isupport,
    channel: &str,
    modes: &str,
    args: I,
) -> Result<ModeApplication, ModeError>
where
    I: IntoIterator<Item = &'a str>,
{
    if registry.get_channel(channel).is_none() {
        warn!(channel = %channel, modes = %modes, "mode change for unknown channel");
        return Err(ModeError::UnknownChannel(channel.to_owned()));
    }
    if let Err(err) = isupport.chanmodes_groups() {
        warn!(channel = %channel, %err, "channel modes cannot be classified");
    }

    let application = parse_mode_change(modes, args, isupport);
    if let Some(chan) = registry.channel_mut(channel) {
        for change in &application.changes {
            apply_one(chan, change);
        }
    }

    if let Err(err) = &application.outcome {
        warn!(channel = %channel, modes = %modes, %err, "mode change aborted");
    }
    Ok(application)
}

fn apply_one(chan: &mut Channel, change: &ModeChange) {
    let arg = change.arg.as_deref();
    match (change.class, arg) {
        (ModeClass::Privilege { .. }, Some(nick)) => {
            let Some(user) = chan.find_user_mut(nick) else {
                warn!(
                    channel = %chan.name(),
                    user = %nick,
                    mode = %change.mode,
                    "privilege change for unknown user"
                );
                return;
            };
            if change.set {
                user.grant(change.mode);
            } else if !user.revoke(change.mode) {
                warn!(
                    channel = %chan.name(),
                    user = %nick,
                    mode = %change.mode,
                    "privilege was not held"
                );
            }
        }
        (ModeClass::List, Some(entry)) => {
            if change.set {
                chan.add_list_entry(change.mode, entry);
            } else {
                chan.remove_list_entry(change.mode, entry);
            }
        }
        (_, Some(value)) if change.set => chan.set_single(change.mode, value),
        (_, _) if change.set => chan.set_simple(change.mode),
        _ => {
            chan.unset_mode(change.mode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ModeValue;

    fn isupport() -> Isupport {
        let mut isupport = Isupport::new();
        isupport.ingest(["CHANMODES=b,k,l,imnpst", "PREFIX=(ov)@+"]);
        isupport
    }

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.add_channel("#c");
        reg.add_user("#c", "alice!a@h");
        reg.add_user("#c", "bob!b@h");
        reg
    }

    #[test]
    fn test_parse_arity() {
        let app = parse_mode_change("+ov-b+l-lk", ["a", "b", "m", "10", "key"], &isupport());
        assert!(app.is_complete());
        assert_eq!(app.consumed, 5);
        let letters: String = app.changes.iter().map(|c| c.mode).collect();
        assert_eq!(letters, "ovbllk");
        assert_eq!(app.changes[4].arg, None);
        assert_eq!(app.changes[5].arg.as_deref(), Some("key"));
    }

    #[test]
    fn test_parse_missing_argument() {
        let app = parse_mode_change("+mk", [], &isupport());
        assert_eq!(app.changes.len(), 1);
        assert_eq!(
            app.outcome,
            Err(ModeError::MissingArgument { sign: '+', mode: 'k' })
        );
    }

    #[test]
    fn test_default_sign_is_set() {
        let app = parse_mode_change("m", [], &isupport());
        assert!(app.changes[0].set);
    }

    #[test]
    fn test_unclassified_letter_takes_no_argument() {
        let app = parse_mode_change("+Zo", ["alice"], &isupport());
        assert_eq!(app.changes[0].class, ModeClass::NoArg);
        assert_eq!(app.changes[1].arg.as_deref(), Some("alice"));
    }

    #[test]
    fn test_apply_privileges() {
        let mut reg = registry();
        let app = apply_mode_change(&mut reg, &isupport(), "#c", "+ov", ["alice", "bob"]).unwrap();
        assert_eq!(app.consumed, 2);
        assert!(reg.find_user("#c", "alice").unwrap().has_privilege('o'));
        assert!(reg.find_user("#c", "bob").unwrap().has_privilege('v'));

        apply_mode_change(&mut reg, &isupport(), "#c", "-o", ["alice"]).unwrap();
        assert!(!reg.find_user("#c", "alice").unwrap().has_privilege('o'));
    }

    #[test]
    fn test_apply_channel_modes() {
        let mut reg = registry();
        let isupport = isupport();
        apply_mode_change(&mut reg, &isupport, "#c", "+bbkln", ["*!*@a", "*!*@b", "pw", "5"])
            .unwrap();
        let chan = reg.get_channel("#c").unwrap();
        assert_eq!(chan.list('b'), ["*!*@a", "*!*@b"]);
        assert_eq!(chan.mode('k'), Some(&ModeValue::Single("pw".into())));
        assert_eq!(chan.mode('l'), Some(&ModeValue::Single("5".into())));
        assert_eq!(chan.mode('n'), Some(&ModeValue::Simple));

        apply_mode_change(&mut reg, &isupport, "#c", "-lk-n", ["pw"]).unwrap();
        let chan = reg.get_channel("#c").unwrap();
        assert!(!chan.has_mode('l'));
        assert!(!chan.has_mode('k'));
        assert!(!chan.has_mode('n'));
    }

    #[test]
    fn test_apply_aborts_without_rollback() {
        let mut reg = registry();
        let app = apply_mode_change(&mut reg, &isupport(), "#c", "+mob", ["alice"]).unwrap();
        assert!(!app.is_complete());
        let chan = reg.get_channel("#c").unwrap();
        assert!(chan.has_mode('m'));
        assert!(chan.find_user("alice").unwrap().has_privilege('o'));
        assert!(!chan.has_mode('b'));
    }

    #[test]
    fn test_apply_unknown_channel() {
        let mut reg = registry();
        assert_eq!(
            apply_mode_change(&mut reg, &isupport(), "#nope", "+m", []),
            Err(ModeError::UnknownChannel("#nope".to_string()))
        );
    }

    #[test]
    fn test_privilege_for_unknown_user_is_skipped() {
        let mut reg = registry();
        let app = apply_mode_change(&mut reg, &isupport(), "#c", "+om", ["ghost"]).unwrap();
        assert!(app.is_complete());
        assert!(reg.get_channel("#c").unwrap().has_mode('m'));
    }
}
