//! # Brass
//!
//! A modular IRC bot engine. One process holds one server connection;
//! behavior lives in modules that subscribe to event capabilities.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐    ┌──────────┐    ┌────────────┐    ┌─────────────────────┐
//! │ Transport │───▶│  Engine  │───▶│ Dispatcher │───▶│ Module "help"       │
//! │ (lines)   │◀───│ (login,  │    │            │───▶│ Module "auto_op"    │
//! └───────────┘    │  loop)   │    └────────────┘───▶│ Module ...          │
//!                  └──────────┘                      └─────────────────────┘
//!                        ▲                 every module holds &mut Controller
//!                        └───────────── send / channels / commands / requests
//! ```
//!
//! - **Transport**: newline-framed reads and writes over TCP
//! - **Engine**: connect, log in, run the operating loop, restart
//! - **Dispatcher**: loads modules and routes events by capability
//! - **Controller**: the handle modules use to talk to the server
//!
//! ## Writing a module
//!
//! ```rust,ignore
//! use brass::prelude::*;
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Module for Greeter {
//!     fn capabilities(&self) -> CapabilitySet {
//!         CapabilitySet::of(&[Capability::JoinChannel])
//!     }
//!
//!     async fn on_join_channel(&mut self, ctl: &mut Controller, channel: &str) -> anyhow::Result<()> {
//!         ctl.say(channel, "Hello!").await?;
//!         Ok(())
//!     }
//! }
//!
//! fn create(_: ModuleConfig, _: &mut Controller) -> anyhow::Result<Box<dyn Module>> {
//!     Ok(Box::new(Greeter))
//! }
//!
//! register_module!(GREETER, "greeter", "Greets every channel it joins", create);
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `brass.toml` configuration files (default)
//! - `json-log`: enable the JSON log format

pub use brass_core as core;
pub use brass_framework as framework;
pub use brass_plugins as plugins;
pub use brass_runtime as runtime;
pub use brass_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use brass::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use brass_runtime::{BrassConfig, ConfigLoader, Engine, Shutdown};

    // Module system
    pub use brass_framework::prelude::*;

    // Protocol types
    pub use brass_core::{Event, canonicalize_channel_name, parse_ident};
}
