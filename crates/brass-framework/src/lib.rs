//! # Brass Framework
//!
//! The module system of the Brass IRC bot engine.
//!
//! This layer provides:
//! - The [`Module`] capability interface that behavior modules implement
//! - The compile-time module registry ([`MODULES`], [`register_module!`])
//! - The [`Controller`] handle modules use to send lines, manage channels and
//!   publish commands
//! - The [`ModuleDispatcher`], which loads modules and routes events to them
//!   with per-module failure isolation

pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod module;

pub use controller::{ControlRequest, Controller, Identity};
pub use dispatcher::{Discovery, ModuleDispatcher, normalize_module_name};
pub use error::{ModuleError, ModuleResult};
pub use module::{
    CreateFn, MODULES, Module, ModuleConfig, ModuleDescriptor, available_modules, find_module,
};

#[doc(hidden)]
pub use linkme;

/// Everything a module implementation usually needs.
pub mod prelude {
    pub use async_trait::async_trait;

    pub use brass_core::{Capability, CapabilitySet, Ident, Line};

    pub use crate::register_module;
    pub use crate::{Controller, Module, ModuleConfig};
}
