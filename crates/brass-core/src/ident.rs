//! User ident parsing.
//!
//! An ident is the origin token of a user-generated line, `:nick!user@host`.
//! Server-originated lines (`:irc.example.net`) and malformed tokens do not
//! parse; callers treat that as "not a user event", never as an error.

use serde::{Deserialize, Serialize};

/// Symbols allowed in a nickname in addition to ASCII letters and digits.
const NICK_SYMBOLS: &[char] = &['<', '_', '-', '[', ']', '^', '{', '}'];

/// A parsed user ident.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ident {
    /// The complete token as given, including the leading `:`.
    pub full: String,
    /// The nickname portion.
    pub nick: String,
}

impl Ident {
    /// Everything after the `!`, i.e. `user@host`.
    pub fn user_host(&self) -> &str {
        self.full
            .split_once('!')
            .map(|(_, rest)| rest)
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.nick)
    }
}

/// Returns `true` if `c` may appear in a nickname.
pub fn is_nick_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || NICK_SYMBOLS.contains(&c)
}

/// Returns `true` if `nick` is a non-empty run of nickname characters.
pub fn is_valid_nick(nick: &str) -> bool {
    !nick.is_empty() && nick.chars().all(is_nick_char)
}

/// Parses a `:nickname!user@host` token.
///
/// Returns `None` when the leading `:` or the `!` separator is missing, when
/// the nickname contains characters outside the allowed class, or when nothing
/// follows the `!`.
pub fn parse_ident(token: &str) -> Option<Ident> {
    let body = token.strip_prefix(':')?;
    let (nick, rest) = body.split_once('!')?;
    if !is_valid_nick(nick) || rest.is_empty() {
        return None;
    }
    Some(Ident {
        full: token.to_string(),
        nick: nick.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_ident() {
        let ident = parse_ident(":alice!a@host").unwrap();
        assert_eq!(ident.nick, "alice");
        assert_eq!(ident.full, ":alice!a@host");
        assert_eq!(ident.user_host(), "a@host");
    }

    #[test]
    fn test_parse_symbol_nicks() {
        for token in [
            ":[away]!u@h",
            ":x_y-z!~u@some.host",
            ":{bot}^!u@1.2.3.4",
            ":Nick99!user@host",
        ] {
            let ident = parse_ident(token).unwrap();
            assert_eq!(ident.full, token);
            assert!(token.starts_with(&format!(":{}!", ident.nick)));
        }
    }

    #[test]
    fn test_parse_malformed_tokens() {
        assert_eq!(parse_ident("alice!a@host"), None);
        assert_eq!(parse_ident(":alice"), None);
        assert_eq!(parse_ident(":irc.example.net"), None);
        assert_eq!(parse_ident(":!a@host"), None);
        assert_eq!(parse_ident(":ali ce!a@host"), None);
        assert_eq!(parse_ident(":alice!"), None);
        assert_eq!(parse_ident(""), None);
    }

    #[test]
    fn test_valid_nick() {
        assert!(is_valid_nick("Brass"));
        assert!(is_valid_nick("b[0]t"));
        assert!(!is_valid_nick(""));
        assert!(!is_valid_nick("has space"));
        assert!(!is_valid_nick("dot.ted"));
    }
}
