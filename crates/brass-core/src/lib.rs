//! # Brass Core
//!
//! Foundation types for the Brass IRC bot engine.
//!
//! This crate holds everything that can be reasoned about without a socket:
//!
//! - **Protocol lines**: tokenizing `[:prefix] COMMAND params [:trailing]` ([`Line`])
//! - **Idents**: decomposing `:nick!user@host` origins ([`parse_ident`], [`Ident`])
//! - **Events**: the tagged [`Event`] type and the fixed [`Capability`] set
//! - **Channel state**: the membership reconciliation map ([`ChannelTracker`])
//! - **Commands**: the per-source command registry ([`CommandRegistry`])
//!
//! ## Data Flow
//!
//! ```text
//! raw line ──▶ Line::parse ──▶ Event::classify ──▶ dispatcher
//!                                   │
//!                                   └── parse_ident (PRIVMSG origins)
//! ```

pub mod channel;
pub mod command;
pub mod event;
pub mod ident;
pub mod line;

pub use channel::{ChannelState, ChannelTracker, canonicalize_channel_name};
pub use command::{CommandRegistry, GENERAL_SOURCE};
pub use event::{Capability, CapabilitySet, Event, Inbound, classify};
pub use ident::{Ident, parse_ident};
pub use line::Line;
