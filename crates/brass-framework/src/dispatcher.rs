//! Module lifecycle management and event dispatch.
//!
//! [`ModuleDispatcher`] is the owner of every loaded module. It:
//!
//! - Resolves discovered identifiers against the compiled-in [`MODULES`]
//!   registry and instantiates them with their config slice
//!   ([`load_all`](ModuleDispatcher::load_all)). A constructor that fails or
//!   panics is skipped with a warning.
//! - Keeps one index list per [`Capability`], so dispatch never calls a module
//!   for hooks it did not declare.
//! - Invokes modules **sequentially** in load order. A hook that returns an
//!   error, panics or exceeds the optional deadline is logged and the next
//!   module still runs.
//! - Drains the controller's pending send notifications after every hook
//!   invocation, in FIFO order, so `on_send_message` never re-enters a module
//!   that is still running.
//! - Tears modules down in reverse load order on reload and shutdown.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut dispatcher = ModuleDispatcher::new(Discovery::All);
//! dispatcher.load_all(&mut ctl);
//! dispatcher.dispatch(&mut ctl, &Event::Tick).await;
//! // …later…
//! dispatcher.teardown_all(&mut ctl).await;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tracing::{Instrument, debug, debug_span, info, warn};

use brass_core::{Capability, CapabilitySet, Event};

use crate::controller::Controller;
use crate::error::{ModuleError, ModuleResult, panic_message};
use crate::module::{MODULES, Module, ModuleConfig, ModuleDescriptor, find_module};

/// Upper bound on send notifications delivered by a single drain.
const MAX_SEND_NOTIFICATIONS: usize = 1024;

// =============================================================================
// Discovery
// =============================================================================

/// Where the list of modules to load comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// Every compiled-in module, in name order.
    All,
    /// Exactly these names, in this order.
    Explicit(Vec<String>),
    /// One module per file in the directory, named after the file stem.
    ///
    /// Files are only used as identifiers; nothing in them is read.
    Directory(PathBuf),
}

impl Discovery {
    /// Produces the ordered list of module identifiers.
    pub fn discover(&self) -> Vec<String> {
        let names = match self {
            Self::All => {
                let mut names: Vec<String> = MODULES.iter().map(|d| d.name.to_string()).collect();
                names.sort();
                names
            }
            Self::Explicit(names) => names.clone(),
            Self::Directory(dir) => scan_directory(dir),
        };

        let mut unique = Vec::with_capacity(names.len());
        for name in names {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        unique
    }
}

fn scan_directory(dir: &std::path::Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(directory = %dir.display(), error = %e, "Unable to open module directory");
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| {
            entry
                .path()
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(normalize_module_name)
        })
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    names
}

/// Maps a file stem to a registry name: `BotControl` and `bot-control` both
/// become `bot_control`.
pub fn normalize_module_name(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len() + 4);
    let mut prev_lower = false;
    for c in stem.chars() {
        if c == '-' || c == ' ' {
            out.push('_');
            prev_lower = false;
        } else if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

// =============================================================================
// ModuleDispatcher
// =============================================================================

struct LoadedModule {
    name: String,
    module: Box<dyn Module>,
    capabilities: CapabilitySet,
}

/// Owns loaded modules and routes events to them.
pub struct ModuleDispatcher {
    modules: Vec<LoadedModule>,
    index: [Vec<usize>; Capability::ALL.len()],
    configs: HashMap<String, Value>,
    discovery: Discovery,
    deadline: Option<Duration>,
}

impl ModuleDispatcher {
    /// Creates an empty dispatcher.
    pub fn new(discovery: Discovery) -> Self {
        Self {
            modules: Vec::new(),
            index: Default::default(),
            configs: HashMap::new(),
            discovery,
            deadline: None,
        }
    }

    /// Sets the per-module configuration slices, keyed by module name.
    pub fn with_configs(mut self, configs: HashMap<String, Value>) -> Self {
        self.configs = configs;
        self
    }

    /// Sets a deadline for every hook invocation.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Replaces the discovery source used by the next [`load_all`](Self::load_all).
    pub fn set_discovery(&mut self, discovery: Discovery) {
        if discovery != self.discovery {
            debug!(from = ?self.discovery, to = ?discovery, "Module discovery changed");
        }
        self.discovery = discovery;
    }

    /// Names of loaded modules, in load order.
    pub fn loaded(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    /// Returns `true` if a module with this name is loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name == name)
    }

    /// Number of loaded modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` if no module is loaded.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Number of loaded modules that declared `cap`.
    pub fn subscribers(&self, cap: Capability) -> usize {
        self.index[cap.index()].len()
    }

    // ─── Loading ────────────────────────────────────────────────────────────

    /// Discovers and instantiates modules that are not loaded yet.
    ///
    /// Returns the names that were loaded by this call.
    pub fn load_all(&mut self, ctl: &mut Controller) -> Vec<String> {
        let mut loaded = Vec::new();
        for id in self.discovery.discover() {
            if self.is_loaded(&id) {
                debug!(module = %id, "Module already loaded");
                continue;
            }
            let Some(descriptor) = find_module(&id) else {
                warn!(error = %ModuleError::Unknown(id.clone()), "Skipping module");
                continue;
            };
            match self.load(descriptor, ctl) {
                Ok(()) => loaded.push(id),
                Err(e) => warn!(module = %id, error = %e, "Module failed to load; skipping"),
            }
        }
        info!(count = self.modules.len(), "Modules loaded");
        loaded
    }

    /// Instantiates one module from its descriptor.
    pub fn load(&mut self, descriptor: &ModuleDescriptor, ctl: &mut Controller) -> ModuleResult<()> {
        let config = match self.configs.get(descriptor.name) {
            Some(value) => ModuleConfig::new(descriptor.name, value.clone()),
            None => ModuleConfig::empty(descriptor.name),
        };

        let created = std::panic::catch_unwind(AssertUnwindSafe(|| (descriptor.create)(config, ctl)));
        let module = match created {
            Ok(Ok(module)) => module,
            Ok(Err(source)) => {
                return Err(ModuleError::Failed {
                    module: descriptor.name.to_string(),
                    hook: "load",
                    source,
                });
            }
            Err(payload) => {
                return Err(ModuleError::Panicked {
                    module: descriptor.name.to_string(),
                    hook: "load",
                    message: panic_message(&*payload),
                });
            }
        };

        self.insert(descriptor.name, module);
        Ok(())
    }

    /// Adds an already-built module at the end of the load order.
    ///
    /// Modules added this way are torn down by [`reload`](Self::reload) but
    /// not recreated, since they have no registry entry.
    pub fn insert(&mut self, name: impl Into<String>, module: Box<dyn Module>) {
        let name = name.into();
        let capabilities = module.capabilities();
        info!(
            module = %name,
            capabilities = ?capabilities.iter().map(Capability::as_str).collect::<Vec<_>>(),
            "Module loaded"
        );
        self.modules.push(LoadedModule {
            name,
            module,
            capabilities,
        });
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        for list in &mut self.index {
            list.clear();
        }
        for (i, loaded) in self.modules.iter().enumerate() {
            for cap in loaded.capabilities.iter() {
                self.index[cap.index()].push(i);
            }
        }
    }

    // ─── Dispatch ───────────────────────────────────────────────────────────

    /// Delivers `event` to every module that declared its capability.
    pub async fn dispatch(&mut self, ctl: &mut Controller, event: &Event) {
        let span = debug_span!("dispatch", event = event.event_name());
        async {
            let targets = self.index[event.capability().index()].clone();
            for idx in targets {
                self.invoke(idx, ctl, event).await;
                self.flush_sent(ctl).await;
            }
        }
        .instrument(span)
        .await
    }

    /// Reports pending outbound lines to `on_send_message` subscribers.
    ///
    /// Lines sent by those hooks are appended to the queue and reported by
    /// the same drain.
    pub async fn flush_sent(&mut self, ctl: &mut Controller) {
        let mut delivered = 0;
        while let Some(line) = ctl.pop_sent() {
            if delivered == MAX_SEND_NOTIFICATIONS {
                warn!(
                    limit = MAX_SEND_NOTIFICATIONS,
                    "Too many send notifications in one drain; dropping the rest"
                );
                ctl.clear_sent();
                break;
            }
            delivered += 1;

            let event = Event::SendAttempt(line);
            let targets = self.index[Capability::SendMessage.index()].clone();
            for idx in targets {
                self.invoke(idx, ctl, &event).await;
            }
        }
    }

    async fn invoke(&mut self, idx: usize, ctl: &mut Controller, event: &Event) {
        let deadline = self.deadline;
        let loaded = &mut self.modules[idx];
        let hook = event.capability().as_str();
        let call = call_hook(loaded.module.as_mut(), ctl, event);
        if let Err(e) = guard(&loaded.name, hook, deadline, call).await {
            warn!(module = %loaded.name, capability = hook, error = %e, "Module invocation failed");
        }
    }

    // ─── Teardown / reload ──────────────────────────────────────────────────

    /// Tears every module down in reverse load order.
    ///
    /// Commands registered under a module's name are removed after its
    /// teardown hook runs.
    pub async fn teardown_all(&mut self, ctl: &mut Controller) {
        let deadline = self.deadline;
        while let Some(mut loaded) = self.modules.pop() {
            let call = loaded.module.teardown(ctl);
            if let Err(e) = guard(&loaded.name, "teardown", deadline, call).await {
                warn!(module = %loaded.name, error = %e, "Module teardown failed");
            }
            let removed = ctl.commands_mut().remove_source(&loaded.name);
            if removed > 0 {
                debug!(module = %loaded.name, removed, "Removed leftover commands");
            }
            info!(module = %loaded.name, "Module unloaded");
        }
        self.rebuild_index();
        self.flush_orphaned(ctl);
    }

    fn flush_orphaned(&self, ctl: &mut Controller) {
        let mut dropped = 0;
        while ctl.pop_sent().is_some() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "Send notifications dropped with no modules loaded");
        }
    }

    /// Tears everything down, optionally swaps the configuration, then
    /// discovers and loads again.
    ///
    /// Returns the names that were loaded.
    pub async fn reload(
        &mut self,
        ctl: &mut Controller,
        configs: Option<HashMap<String, Value>>,
    ) -> Vec<String> {
        info!("Reloading modules");
        self.teardown_all(ctl).await;
        if let Some(configs) = configs {
            self.configs = configs;
        }
        self.load_all(ctl)
    }

    /// The configuration slice that would be passed to `name`.
    pub fn config_for(&self, name: &str) -> Value {
        self.configs
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::default()))
    }
}

impl std::fmt::Debug for ModuleDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDispatcher")
            .field("modules", &self.loaded())
            .field("discovery", &self.discovery)
            .field("deadline", &self.deadline)
            .finish()
    }
}

fn call_hook<'a>(
    module: &'a mut dyn Module,
    ctl: &'a mut Controller,
    event: &'a Event,
) -> BoxFuture<'a, anyhow::Result<()>> {
    match event {
        Event::ChannelMessage {
            sender,
            channel,
            text,
        } => module.on_channel_message(ctl, sender, channel, text),
        Event::PrivateMessage { sender, text } => module.on_private_message(ctl, sender, text),
        Event::DataMessage(line) => module.on_data_message(ctl, line),
        Event::Tick => module.on_tick(ctl),
        Event::JoinedChannel(channel) => module.on_join_channel(ctl, channel),
        Event::SendAttempt(line) => module.on_send_message(ctl, line),
        Event::RestartRequested => module.on_restart(ctl),
    }
}

/// Runs one hook, converting errors, panics and timeouts into [`ModuleError`].
async fn guard<F>(
    module: &str,
    hook: &'static str,
    deadline: Option<Duration>,
    call: F,
) -> ModuleResult<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    let call = AssertUnwindSafe(call).catch_unwind();
    let outcome = match deadline {
        Some(after) => match tokio::time::timeout(after, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                return Err(ModuleError::TimedOut {
                    module: module.to_string(),
                    hook,
                    after,
                });
            }
        },
        None => call.await,
    };

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(ModuleError::Failed {
            module: module.to_string(),
            hook,
            source,
        }),
        Err(payload) => Err(ModuleError::Panicked {
            module: module.to_string(),
            hook,
            message: panic_message(&*payload),
        }),
    }
}
