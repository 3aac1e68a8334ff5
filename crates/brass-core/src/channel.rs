//! Channel membership tracking.
//!
//! The [`ChannelTracker`] is the authoritative record of which channels the bot
//! *should* be in and whether it has issued a join for each:
//!
//! ```text
//! request("foo") ──▶ #foo { joined: false }
//!                        │ reconcile_pending()   (once per tick)
//!                        ▼
//!                    #foo { joined: true }
//!                        │ release("#foo")
//!                        ▼
//!                    (removed, PART emitted if it was joined)
//! ```
//!
//! Reconciliation never un-joins a channel; only [`release`](ChannelTracker::release) does.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Adds a leading `#` if the name does not already have one.
pub fn canonicalize_channel_name(name: &str) -> String {
    let name = name.trim();
    if name.starts_with('#') {
        name.to_string()
    } else {
        format!("#{name}")
    }
}

/// Membership status of one tracked channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    /// Canonical channel name, always starting with `#`.
    pub name: String,
    /// Whether a join has been issued for this channel.
    pub joined: bool,
}

/// Insertion-ordered map of channel name to membership status.
#[derive(Debug, Clone, Default)]
pub struct ChannelTracker {
    channels: Vec<ChannelState>,
}

impl ChannelTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    /// Starts tracking each channel that is not tracked yet, as not joined.
    ///
    /// Returns the canonical names that were newly inserted.
    pub fn request<I, S>(&mut self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = Vec::new();
        for name in names {
            let name = canonicalize_channel_name(name.as_ref());
            if name.len() < 2 || self.position(&name).is_some() {
                continue;
            }
            debug!(channel = %name, "Channel requested");
            self.channels.push(ChannelState {
                name: name.clone(),
                joined: false,
            });
            added.push(name);
        }
        added
    }

    /// Stops tracking each given channel.
    ///
    /// Returns the names of removed channels that had been joined; the caller
    /// is responsible for parting them.
    pub fn release<I, S>(&mut self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut to_part = Vec::new();
        for name in names {
            let name = canonicalize_channel_name(name.as_ref());
            if let Some(pos) = self.position(&name) {
                let state = self.channels.remove(pos);
                debug!(channel = %state.name, joined = state.joined, "Channel released");
                if state.joined {
                    to_part.push(state.name);
                }
            }
        }
        to_part
    }

    /// Marks every pending channel as joined and returns their names.
    ///
    /// The caller issues the join instruction for each returned name. If that
    /// fails it should call [`mark_pending`](Self::mark_pending) so the channel
    /// is retried on the next tick.
    pub fn reconcile_pending(&mut self) -> Vec<String> {
        self.channels
            .iter_mut()
            .filter(|c| !c.joined)
            .map(|c| {
                c.joined = true;
                c.name.clone()
            })
            .collect()
    }

    /// Names of tracked channels that have not been joined yet.
    pub fn pending(&self) -> Vec<String> {
        self.channels
            .iter()
            .filter(|c| !c.joined)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Resets a tracked channel to not joined.
    pub fn mark_pending(&mut self, name: &str) {
        let name = canonicalize_channel_name(name);
        if let Some(pos) = self.position(&name) {
            self.channels[pos].joined = false;
        }
    }

    /// Returns `true` if the channel is tracked (joined or not).
    pub fn contains(&self, name: &str) -> bool {
        self.position(&canonicalize_channel_name(name)).is_some()
    }

    /// Returns `true` if the channel is tracked and joined.
    pub fn is_joined(&self, name: &str) -> bool {
        self.position(&canonicalize_channel_name(name))
            .is_some_and(|pos| self.channels[pos].joined)
    }

    /// Names of joined channels, in insertion order.
    pub fn joined(&self) -> Vec<String> {
        self.channels
            .iter()
            .filter(|c| c.joined)
            .map(|c| c.name.clone())
            .collect()
    }

    /// A copy of every tracked entry, in insertion order.
    pub fn snapshot(&self) -> Vec<ChannelState> {
        self.channels.clone()
    }

    /// Number of tracked channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if no channel is tracked.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
