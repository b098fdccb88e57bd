use std::str::FromStr;

use crate::error::{MessageParseError, ProtocolError};
use crate::prefix::nick_of;
use crate::response::Response;

/// One IRC protocol line.
///
/// `params` holds the space-separated middle parameters in order; the final
/// colon-introduced parameter, if any, lives in `trailing`. Positional access
/// through [`Message::arg`] treats the trailing text as the parameter after
/// the last middle one, which is how the protocol itself numbers them.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// Sender, without the leading `:`.
    pub prefix: Option<String>,
    /// Command verb or three-digit numeric, uppercased on parse.
    pub command: String,
    /// Middle parameters.
    pub params: Vec<String>,
    /// Trailing parameter, without the leading `:`.
    pub trailing: Option<String>,
}

impl Message {
    /// Create a message with no prefix, parameters or trailing text.
    pub fn new<C: Into<String>>(command: C) -> Message {
        Message {
            prefix: None,
            command: command.into(),
            params: Vec::new(),
            trailing: None,
        }
    }

    /// Set the prefix.
    pub fn with_prefix<P: Into<String>>(mut self, prefix: P) -> Message {
        self.prefix = Some(prefix.into());
        self
    }

    /// Append a middle parameter.
    pub fn with_param<P: Into<String>>(mut self, param: P) -> Message {
        self.params.push(param.into());
        self
    }

    /// Set the trailing parameter.
    pub fn with_trailing<T: Into<String>>(mut self, trailing: T) -> Message {
        self.trailing = Some(trailing.into());
        self
    }

    /// Positional argument `index`, counting the trailing text as the last.
    pub fn arg(&self, index: usize) -> Option<&str> {
        match self.params.get(index) {
            Some(p) => Some(p),
            None if index == self.params.len() => self.trailing.as_deref(),
            None => None,
        }
    }

    /// Number of positional arguments, trailing included.
    pub fn arg_count(&self) -> usize {
        self.params.len() + usize::from(self.trailing.is_some())
    }

    /// All positional arguments in order, trailing last.
    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .map(String::as_str)
            .chain(self.trailing.as_deref())
    }

    /// Fail with [`MessageParseError::NotEnoughArguments`] unless at least
    /// `expected` positional arguments are present.
    pub fn require_args(&self, expected: usize) -> Result<(), MessageParseError> {
        let got = self.arg_count();
        if got < expected {
            return Err(MessageParseError::NotEnoughArguments {
                command: self.command.clone(),
                expected,
                got,
            });
        }
        Ok(())
    }

    /// Case-insensitive command comparison.
    pub fn is_command(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// The numeric this message carries, if it is a known one.
    pub fn response(&self) -> Option<Response> {
        self.command.parse().ok()
    }

    /// Nickname part of the prefix.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_deref().map(nick_of)
    }

    /// Length of the serialized line, excluding the CRLF terminator.
    pub fn wire_len(&self) -> usize {
        self.to_string().len()
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        super::parse::parse_line(s).map_err(|cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_counts_trailing_last() {
        let msg = Message::new("KICK")
            .with_param("#c")
            .with_param("bob")
            .with_trailing("bye");
        assert_eq!(msg.arg(0), Some("#c"));
        assert_eq!(msg.arg(2), Some("bye"));
        assert_eq!(msg.arg(3), None);
        assert_eq!(msg.arg_count(), 3);
        assert_eq!(msg.args().collect::<Vec<_>>(), ["#c", "bob", "bye"]);
    }

    #[test]
    fn test_require_args() {
        let msg = Message::new("KICK").with_param("#c");
        assert_eq!(
            msg.require_args(2),
            Err(MessageParseError::NotEnoughArguments {
                command: "KICK".to_string(),
                expected: 2,
                got: 1,
            })
        );
        assert!(msg.require_args(1).is_ok());
    }

    #[test]
    fn test_response_and_source() {
        let msg: Message = ":irc.example.org 005 me CHANMODES=b,k,l,imnpst :are supported"
            .parse()
            .unwrap();
        assert_eq!(msg.response(), Some(Response::RPL_ISUPPORT));

        let msg: Message = ":Alice!a@h PRIVMSG #c :hi".parse().unwrap();
        assert_eq!(msg.source_nickname(), Some("Alice"));
        assert_eq!(msg.response(), None);
        assert!(msg.is_command("privmsg"));
    }

    #[test]
    fn test_from_str_error_carries_input() {
        let err = ":only-a-prefix".parse::<Message>().unwrap_err();
        match err {
            ProtocolError::InvalidMessage { string, cause } => {
                assert_eq!(string, ":only-a-prefix");
                assert_eq!(cause, MessageParseError::UnterminatedPrefix);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
