//! Protocol line tokenizer.
//!
//! Lines arrive as `[:prefix] COMMAND param1 param2 ... [:trailing words]`.
//! A [`Line`] keeps two views of the same text:
//!
//! - [`tokens`](Line::tokens): the raw split on single spaces, exactly as it
//!   appeared on the wire (the prefix keeps its leading `:`).
//! - [`prefix`](Line::prefix) / [`command`](Line::command) / [`params`](Line::params):
//!   the structured view, where the colon-introduced trailing parameter is a
//!   single entry containing its embedded spaces.

use serde::{Deserialize, Serialize};

/// A single tokenized protocol line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    raw: String,
    tokens: Vec<String>,
    prefix: Option<String>,
    command: String,
    params: Vec<String>,
}

impl Line {
    /// Parses a line, stripping any trailing CR/LF.
    ///
    /// Returns `None` for blank input; every other input produces a `Line`
    /// even if it is not a well-formed protocol message.
    pub fn parse(input: &str) -> Option<Self> {
        let raw = input.trim_end_matches(['\r', '\n']);
        if raw.trim().is_empty() {
            return None;
        }

        let tokens: Vec<String> = raw.split(' ').map(str::to_string).collect();

        let mut rest = raw.trim_start();
        let mut prefix = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (p, r) = stripped.split_once(' ').unwrap_or((stripped, ""));
            prefix = Some(p.to_string());
            rest = r.trim_start_matches(' ');
        }

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            let (param, r) = rest.split_once(' ').unwrap_or((rest, ""));
            params.push(param.to_string());
            rest = r;
        }

        Some(Self {
            raw: raw.to_string(),
            tokens,
            prefix,
            command: command.to_string(),
            params,
        })
    }

    /// The line as received, without line terminators.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The raw single-space split of the line.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Returns the raw token at `index`, if present.
    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// The origin prefix without its leading `:`.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The first token with its leading `:` retained, as fed to [`parse_ident`].
    ///
    /// [`parse_ident`]: crate::ident::parse_ident
    pub fn origin_token(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(|_| self.token(0))
    }

    /// The command word or numeric (`PRIVMSG`, `004`, `PING`, ...).
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Structured parameters; the trailing parameter is a single entry.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Returns the structured parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The last parameter, which is where free text lives for most commands.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Returns `true` if the command is a three-digit numeric reply.
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit())
    }

    /// Case-insensitive command comparison.
    pub fn is_command(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg_with_trailing() {
        let line = Line::parse(":alice!a@host PRIVMSG #room :hello there\r\n").unwrap();
        assert_eq!(line.prefix(), Some("alice!a@host"));
        assert_eq!(line.origin_token(), Some(":alice!a@host"));
        assert_eq!(line.command(), "PRIVMSG");
        assert_eq!(line.params(), &["#room", "hello there"]);
        assert_eq!(line.trailing(), Some("hello there"));
        assert_eq!(line.tokens().len(), 5);
        assert_eq!(line.raw(), ":alice!a@host PRIVMSG #room :hello there");
    }

    #[test]
    fn test_parse_without_prefix() {
        let line = Line::parse("PING :server1").unwrap();
        assert_eq!(line.prefix(), None);
        assert_eq!(line.origin_token(), None);
        assert!(line.is_command("ping"));
        assert_eq!(line.params(), &["server1"]);
    }

    #[test]
    fn test_parse_numeric() {
        let line = Line::parse(":irc.example.net 004 Bot irc.example.net ircd-1.0 iow ntk").unwrap();
        assert!(line.is_numeric());
        assert_eq!(line.command(), "004");
        assert_eq!(line.param(0), Some("Bot"));
        assert_eq!(line.params().len(), 5);
    }

    #[test]
    fn test_parse_blank_is_none() {
        assert!(Line::parse("").is_none());
        assert!(Line::parse("   \r\n").is_none());
    }

    #[test]
    fn test_trailing_keeps_colons_and_spaces() {
        let line = Line::parse(":n!u@h TOPIC #c :a: b :c").unwrap();
        assert_eq!(line.params(), &["#c", "a: b :c"]);
    }

    #[test]
    fn test_join_with_colon_channel() {
        let line = Line::parse(":bob!b@h JOIN :#room").unwrap();
        assert_eq!(line.command(), "JOIN");
        assert_eq!(line.param(0), Some("#room"));
        assert_eq!(line.token(2), Some(":#room"));
    }
}
