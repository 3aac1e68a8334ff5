//! # Brass Plugins
//!
//! Reference behavior modules for the Brass IRC bot engine. Each module
//! registers itself in [`brass_framework::MODULES`] at link time, so depending
//! on this crate is enough to make them discoverable.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `help` | answers `!help` from the command registry |
//! | `bot_control` | `!memory`, `!uptime`, operator-only `!restart` and `!reload`, joins on invite |
//! | `auto_op` | grants operator status to configured users on join |
//! | `channel_logger` | writes channel activity to daily log files |

mod auto_op;
mod bot_control;
mod channel_logger;
mod help;

/// Names of the modules this crate provides.
pub const MODULE_NAMES: &[&str] = &["auto_op", "bot_control", "channel_logger", "help"];

/// Names of the modules provided here that are registered in the running
/// binary.
///
/// Calling this from the executable also keeps the crate linked.
pub fn linked_modules() -> Vec<&'static str> {
    brass_framework::available_modules()
        .into_iter()
        .filter(|name| MODULE_NAMES.contains(name))
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use brass_core::Ident;
    use brass_framework::Controller;
    use brass_transport::{MemoryHandle, MemoryTransport};

    /// A logged-in controller backed by an in-memory transport.
    pub fn controller() -> (Controller, MemoryHandle) {
        let (transport, handle) = MemoryTransport::pair();
        let mut ctl = Controller::new(Box::new(transport));
        ctl.set_identity("brassbot", "brass");
        (ctl, handle)
    }

    pub fn ident(nick: &str) -> Ident {
        Controller::parse_ident(&format!(":{nick}!{nick}@example.org"))
            .expect("valid test ident")
    }

    pub fn alice() -> Ident {
        ident("alice")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_modules_are_registered() {
        assert_eq!(linked_modules(), MODULE_NAMES);
    }
}
