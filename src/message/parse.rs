//! Nom-based line parser.

use nom::{
    bytes::complete::{take_till, take_while1},
    character::complete::{char, space1},
    error::{context, VerboseError},
    sequence::{preceded, terminated},
    IResult,
};

use crate::error::MessageParseError;
use crate::util::MAX_PARAMS;

use super::Message;

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// IRCv3 tag section. Tags are recognised so they can be skipped.
fn parse_tags(input: &str) -> ParseResult<'_, &str> {
    context(
        "parsing message tags",
        terminated(preceded(char('@'), take_till(|c: char| c == ' ')), space1),
    )(input)
}

fn parse_prefix(input: &str) -> ParseResult<'_, &str> {
    context(
        "parsing message prefix",
        terminated(preceded(char(':'), take_till(|c: char| c == ' ')), space1),
    )(input)
}

fn parse_command(input: &str) -> ParseResult<'_, &str> {
    context(
        "parsing command",
        take_while1(|c: char| c.is_ascii_alphanumeric()),
    )(input)
}

/// Parse one line, with or without its terminator.
pub(super) fn parse_line(line: &str) -> Result<Message, MessageParseError> {
    let mut rest = line.trim_end_matches(['\r', '\n']).trim_start_matches(' ');
    if rest.trim_end_matches(' ').is_empty() {
        return Err(MessageParseError::EmptyMessage);
    }

    if rest.starts_with('@') {
        let (after, _tags) = parse_tags(rest).map_err(|_| MessageParseError::InvalidCommand)?;
        rest = after;
    }

    let mut prefix = None;
    if rest.starts_with(':') {
        let (after, raw) =
            parse_prefix(rest).map_err(|_| MessageParseError::UnterminatedPrefix)?;
        if !raw.is_empty() {
            prefix = Some(raw.to_owned());
        }
        rest = after;
    }

    let (after, command) = parse_command(rest).map_err(|_| MessageParseError::InvalidCommand)?;
    if !(after.is_empty() || after.starts_with(' ')) {
        return Err(MessageParseError::InvalidCommand);
    }
    rest = after;

    let mut params = Vec::new();
    let mut trailing = None;
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }
        if let Some(text) = rest.strip_prefix(':') {
            trailing = Some(text.to_owned());
            break;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(rest[..end].to_owned());
        rest = &rest[end..];
    }

    if params.len() > MAX_PARAMS {
        return Err(MessageParseError::TooManyParams(params.len()));
    }

    Ok(Message {
        prefix,
        command: command.to_ascii_uppercase(),
        params,
        trailing,
    })
}
