//! The module capability interface and compile-time module registry.
//!
//! A module is any type implementing [`Module`]. It declares the
//! [`Capability`] values it reacts to and overrides the matching hooks; every
//! hook has a no-op default so a module only writes what it needs.
//!
//! Modules are made known to the engine through a [`ModuleDescriptor`]
//! registered with [`register_module!`]. The descriptors end up in the
//! [`MODULES`] distributed slice at link time, so the set of available
//! modules is fixed when the binary is built and never involves loading
//! code at runtime.
//!
//! # Example
//!
//! ```rust,ignore
//! use brass_framework::prelude::*;
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
//!         ctl.send_line(&format!("PRIVMSG {channel} :hello")).await?;
//!         Ok(())
//!     }
//! }
//!
//! fn create(_config: ModuleConfig, _ctl: &mut Controller) -> anyhow::Result<Box<dyn Module>> {
//!     Ok(Box::new(Greeter))
//! }
//!
//! register_module!(GREETER, "greeter", "Says hello in every joined channel", create);
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use linkme::distributed_slice;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use brass_core::{CapabilitySet, Ident, Line};

use crate::controller::Controller;

// =============================================================================
// Module trait
// =============================================================================

/// A pluggable behavior unit.
///
/// Hooks are only called for capabilities listed in
/// [`capabilities`](Module::capabilities). Returning an error from a hook is
/// logged by the dispatcher and has no other effect.
#[async_trait]
pub trait Module: Send {
    /// The events this module wants to receive.
    fn capabilities(&self) -> CapabilitySet;

    /// A chat line was addressed to a channel.
    async fn on_channel_message(
        &mut self,
        _ctl: &mut Controller,
        _sender: &Ident,
        _channel: &str,
        _text: &str,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A chat line was addressed to the bot.
    async fn on_private_message(
        &mut self,
        _ctl: &mut Controller,
        _sender: &Ident,
        _text: &str,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Any other protocol line arrived.
    async fn on_data_message(&mut self, _ctl: &mut Controller, _line: &Line) -> anyhow::Result<()> {
        Ok(())
    }

    /// One main-loop iteration completed.
    async fn on_tick(&mut self, _ctl: &mut Controller) -> anyhow::Result<()> {
        Ok(())
    }

    /// A join was issued for `channel`.
    async fn on_join_channel(&mut self, _ctl: &mut Controller, _channel: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// `line` was written to the server.
    async fn on_send_message(&mut self, _ctl: &mut Controller, _line: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// A graceful restart is beginning.
    async fn on_restart(&mut self, _ctl: &mut Controller) -> anyhow::Result<()> {
        Ok(())
    }

    /// The module is being unloaded (shutdown, restart or reload).
    ///
    /// Commands registered under the module's own name are removed by the
    /// dispatcher afterwards.
    async fn teardown(&mut self, _ctl: &mut Controller) -> anyhow::Result<()> {
        Ok(())
    }
}

// =============================================================================
// ModuleConfig
// =============================================================================

/// The configuration slice handed to a module constructor.
///
/// Wraps the raw JSON value from `[modules.config.<name>]`, or an empty
/// object when the section is absent.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    name: String,
    value: Arc<Value>,
}

impl ModuleConfig {
    /// Creates a config slice for `name`.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value: Arc::new(value),
        }
    }

    /// An empty config slice.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Value::Object(Map::default()))
    }

    /// The module name this slice belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deserialises the slice into `T`.
    ///
    /// Use `#[serde(default)]` on the struct to make every field optional.
    pub fn parse<T>(&self) -> serde_json::Result<T>
    where
        T: DeserializeOwned,
    {
        T::deserialize(self.value.as_ref())
    }

    /// The raw JSON value.
    pub fn raw(&self) -> &Value {
        &self.value
    }

    /// Returns `true` if the slice is null or an empty object.
    pub fn is_empty(&self) -> bool {
        match self.value.as_ref() {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Constructor signature for a module.
///
/// Runs once per load with the module's config slice. The controller may be
/// used to request channels and register commands; nothing can be sent yet.
pub type CreateFn = fn(ModuleConfig, &mut Controller) -> anyhow::Result<Box<dyn Module>>;

/// A static handle that names and constructs a module.
#[derive(Debug, Clone, Copy)]
pub struct ModuleDescriptor {
    /// Registry key, used for discovery and as the config lookup key.
    pub name: &'static str,
    /// One-line description for logs and help output.
    pub description: &'static str,
    /// Factory function.
    pub create: CreateFn,
}

/// Every module compiled into the binary.
#[distributed_slice]
pub static MODULES: [ModuleDescriptor];

/// Looks up a compiled-in module by name.
pub fn find_module(name: &str) -> Option<&'static ModuleDescriptor> {
    MODULES.iter().find(|d| d.name == name)
}

/// Names of all compiled-in modules, sorted.
pub fn available_modules() -> Vec<&'static str> {
    let mut names: Vec<_> = MODULES.iter().map(|d| d.name).collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Registers a [`ModuleDescriptor`] in [`MODULES`].
///
/// ```rust,ignore
/// register_module!(HELP, "help", "Lists the commands the bot understands", create);
/// ```
#[macro_export]
macro_rules! register_module {
    ($static_name:ident, $name:literal, $desc:literal, $create:expr $(,)?) => {
        #[$crate::linkme::distributed_slice($crate::MODULES)]
        #[linkme(crate = $crate::linkme)]
        static $static_name: $crate::ModuleDescriptor = $crate::ModuleDescriptor {
            name: $name,
            description: $desc,
            create: $create,
        };
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Sample {
        directory: String,
        channels: Vec<String>,
    }

    #[test]
    fn test_config_parse_with_defaults() {
        let config = ModuleConfig::new(
            "logger",
            serde_json::json!({ "channels": ["#a", "#b"] }),
        );
        let parsed: Sample = config.parse().unwrap();
        assert_eq!(parsed.directory, "");
        assert_eq!(parsed.channels, vec!["#a", "#b"]);
        assert!(!config.is_empty());
    }

    #[test]
    fn test_empty_config() {
        let config = ModuleConfig::empty("x");
        assert!(config.is_empty());
        assert_eq!(config.name(), "x");
        let parsed: Sample = config.parse().unwrap();
        assert!(parsed.channels.is_empty());
    }
}
