//! Event system for the Brass engine.
//!
//! Every inbound line is classified exactly once into an [`Inbound`] value.
//! Lines that reach the module layer become an [`Event`]; each event variant
//! corresponds to one [`Capability`] a module can declare.
//!
//! ```text
//! Line ──▶ classify() ──┬─▶ Inbound::Ping      (answered by the engine)
//!                       ├─▶ Inbound::Error     (fatal)
//!                       ├─▶ Inbound::Ignored   (PRIVMSG without a user ident)
//!                       └─▶ Inbound::Event(ChannelMessage | PrivateMessage | DataMessage)
//! ```
//!
//! The engine produces the remaining variants itself: `Tick` once per loop
//! iteration, `JoinedChannel` after a JOIN is written, `SendAttempt` after any
//! outbound line is written and `RestartRequested` when a restart begins.

use crate::ident::{Ident, parse_ident};
use crate::line::Line;

// ============================================================================
// Capability
// ============================================================================

/// The fixed set of event kinds a module may react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// A chat line addressed to a channel.
    ChannelMessage,
    /// A chat line addressed to the bot.
    PrivateMessage,
    /// Any other protocol line.
    DataMessage,
    /// One main-loop iteration.
    Tick,
    /// The engine issued a join for a channel.
    JoinChannel,
    /// The engine wrote an outbound line.
    SendMessage,
    /// A graceful restart is beginning.
    Restart,
}

impl Capability {
    /// All capabilities, in declaration order.
    pub const ALL: [Capability; 7] = [
        Capability::ChannelMessage,
        Capability::PrivateMessage,
        Capability::DataMessage,
        Capability::Tick,
        Capability::JoinChannel,
        Capability::SendMessage,
        Capability::Restart,
    ];

    /// Stable snake_case name, used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChannelMessage => "on_channel_message",
            Self::PrivateMessage => "on_private_message",
            Self::DataMessage => "on_data_message",
            Self::Tick => "on_tick",
            Self::JoinChannel => "on_join_channel",
            Self::SendMessage => "on_send_message",
            Self::Restart => "on_restart",
        }
    }

    /// Position of this capability inside [`Capability::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compact set of [`Capability`] values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Builds a set from a slice of capabilities.
    pub const fn of(caps: &[Capability]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < caps.len() {
            bits |= 1 << (caps[i] as u8);
            i += 1;
        }
        Self(bits)
    }

    /// Returns a copy of this set with `cap` added.
    pub fn with(self, cap: Capability) -> Self {
        Self(self.0 | cap.bit())
    }

    /// Returns `true` if `cap` is in the set.
    pub fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    /// Iterates the contained capabilities in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }

    /// Returns `true` if no capability is in the set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

// ============================================================================
// Event
// ============================================================================

/// A typed event delivered to modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A `PRIVMSG` whose target starts with `#`.
    ChannelMessage {
        sender: Ident,
        channel: String,
        text: String,
    },
    /// A `PRIVMSG` addressed to anything other than a channel.
    PrivateMessage { sender: Ident, text: String },
    /// Any other non-empty protocol line.
    DataMessage(Line),
    /// One main-loop iteration completed classification.
    Tick,
    /// A join was issued for this channel.
    JoinedChannel(String),
    /// This raw line was written to the server.
    SendAttempt(String),
    /// A graceful restart is beginning.
    RestartRequested,
}

impl Event {
    /// The capability a module must declare to receive this event.
    pub fn capability(&self) -> Capability {
        match self {
            Self::ChannelMessage { .. } => Capability::ChannelMessage,
            Self::PrivateMessage { .. } => Capability::PrivateMessage,
            Self::DataMessage(_) => Capability::DataMessage,
            Self::Tick => Capability::Tick,
            Self::JoinedChannel(_) => Capability::JoinChannel,
            Self::SendAttempt(_) => Capability::SendMessage,
            Self::RestartRequested => Capability::Restart,
        }
    }

    /// Short name used in log fields.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ChannelMessage { .. } => "channel_message",
            Self::PrivateMessage { .. } => "private_message",
            Self::DataMessage(_) => "data_message",
            Self::Tick => "tick",
            Self::JoinedChannel(_) => "joined_channel",
            Self::SendAttempt(_) => "send_attempt",
            Self::RestartRequested => "restart_requested",
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Result of classifying one inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A server `PING`; the engine answers it and does nothing else.
    Ping(Line),
    /// A server `ERROR`; fatal.
    Error(Line),
    /// A `PRIVMSG` whose origin is not a user ident.
    Ignored(Line),
    /// Everything that is handed to modules.
    Event(Event),
}

/// Classifies a parsed line.
pub fn classify(line: Line) -> Inbound {
    if line.is_command("PING") {
        return Inbound::Ping(line);
    }
    if line.is_command("ERROR") {
        return Inbound::Error(line);
    }
    if !line.is_command("PRIVMSG") {
        return Inbound::Event(Event::DataMessage(line));
    }

    let sender = match line.origin_token().and_then(parse_ident) {
        Some(sender) => sender,
        None => return Inbound::Ignored(line),
    };
    let target = line.param(0).unwrap_or_default().to_string();
    let text = if line.params().len() > 1 {
        line.trailing().unwrap_or_default().trim().to_string()
    } else {
        String::new()
    };

    if target.starts_with('#') {
        Inbound::Event(Event::ChannelMessage {
            sender,
            channel: target,
            text,
        })
    } else {
        Inbound::Event(Event::PrivateMessage { sender, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_str(s: &str) -> Inbound {
        classify(Line::parse(s).unwrap())
    }

    #[test]
    fn test_channel_message() {
        match classify_str(":alice!a@host PRIVMSG #room :hello there") {
            Inbound::Event(Event::ChannelMessage {
                sender,
                channel,
                text,
            }) => {
                assert_eq!(sender.nick, "alice");
                assert_eq!(channel, "#room");
                assert_eq!(text, "hello there");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_private_message() {
        match classify_str(":alice!a@host PRIVMSG Bot :hi") {
            Inbound::Event(Event::PrivateMessage { sender, text }) => {
                assert_eq!(sender.nick, "alice");
                assert_eq!(text, "hi");
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_ping_and_error() {
        assert!(matches!(classify_str("PING :server1"), Inbound::Ping(_)));
        assert!(matches!(
            classify_str("ERROR :Closing Link"),
            Inbound::Error(_)
        ));
    }

    #[test]
    fn test_server_privmsg_is_ignored() {
        assert!(matches!(
            classify_str(":irc.example.net PRIVMSG Bot :notice"),
            Inbound::Ignored(_)
        ));
    }

    #[test]
    fn test_other_lines_are_data() {
        match classify_str(":bob!b@h JOIN :#room") {
            Inbound::Event(event @ Event::DataMessage(_)) => {
                assert_eq!(event.capability(), Capability::DataMessage);
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_capability_set() {
        let set = CapabilitySet::of(&[Capability::Tick, Capability::Restart]);
        assert!(set.contains(Capability::Tick));
        assert!(!set.contains(Capability::ChannelMessage));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Capability::Tick, Capability::Restart]
        );
        assert!(CapabilitySet::EMPTY.is_empty());

        let collected: CapabilitySet = [Capability::SendMessage].into_iter().collect();
        assert!(collected.contains(Capability::SendMessage));
    }

    #[test]
    fn test_capability_index_matches_all() {
        for (i, cap) in Capability::ALL.iter().enumerate() {
            assert_eq!(cap.index(), i);
        }
    }
}
