//! The connection engine.
//!
//! An [`Engine`] owns one server connection from start to finish:
//!
//! ```text
//! Connecting ──▶ LoggingIn ──▶ Operating ──▶ Terminated
//!     │              │             │
//!     └── Connect    └── Login     ├── ProtocolFatal (server ERROR)
//!                        LoginTimeout  ├── ConnectionLost (EOF / idle)
//!                                  └── Shutdown::{Normal, Restart, Signal}
//! ```
//!
//! While operating, each iteration reads at most one line, answers `PING`
//! directly, classifies everything else into an [`Event`] for the modules,
//! joins pending channels, ticks every module and then carries out any
//! control requests the modules queued.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use brass_core::{Event, Inbound, Line, classify};
use brass_framework::{ControlRequest, Controller, ModuleDispatcher};
use brass_transport::{
    LineTransport, TcpTransport, TransportOptions, tracing_observer,
};

use crate::config::{BrassConfig, ConfigResult, validate_config};
use crate::error::{EngineError, EngineResult};
use crate::state::StateStore;

/// Exit status asking the supervisor to start the bot again.
pub const RESTART_EXIT_CODE: i32 = 75;

const SHUTDOWN_MESSAGE: &str = "Shutting down";

/// How an engine run ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shutdown {
    /// A module asked the bot to quit.
    Normal { reason: String },
    /// A module asked for a restart; channel state was saved.
    Restart { reason: String },
    /// The process received SIGINT or SIGTERM.
    Signal,
}

impl Shutdown {
    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Normal { .. } | Self::Signal => 0,
            Self::Restart { .. } => RESTART_EXIT_CODE,
        }
    }
}

/// Lifecycle phase of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Connecting,
    LoggingIn,
    Operating,
    Terminated,
}

/// Re-reads configuration when modules ask for a reload.
pub type ConfigReloader = Box<dyn FnMut() -> ConfigResult<BrassConfig> + Send>;

enum LoginOutcome {
    Welcomed,
    Interrupted,
}

/// Drives one IRC connection.
pub struct Engine {
    config: BrassConfig,
    dispatcher: ModuleDispatcher,
    store: StateStore,
    local_host: String,
    shutdown: CancellationToken,
    transport: Option<Box<dyn LineTransport>>,
    reloader: Option<ConfigReloader>,
    state: EngineState,
}

impl Engine {
    /// Starts building an engine for `config`.
    pub fn builder(config: BrassConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    /// Token that stops the engine gracefully when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Connects, logs in and runs until the connection ends.
    ///
    /// Modules are always torn down and the transport closed before this
    /// returns, whatever the outcome.
    pub async fn run(mut self) -> EngineResult<Shutdown> {
        let transport = match self.connect().await {
            Ok(transport) => transport,
            Err(e) => {
                error!(error = %e, "Unable to open connection");
                self.transition(EngineState::Terminated);
                return Err(e);
            }
        };
        let mut ctl = Controller::new(transport);

        let result = match self.login(&mut ctl).await {
            Ok(LoginOutcome::Welcomed) => self.operate(&mut ctl).await,
            Ok(LoginOutcome::Interrupted) => {
                info!("Interrupted during login");
                let _ = ctl.quit(SHUTDOWN_MESSAGE).await;
                Ok(Shutdown::Signal)
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(shutdown) => info!(outcome = ?shutdown, "Engine stopping"),
            Err(e) => error!(error = %e, "Engine stopping on error"),
        }

        self.dispatcher.teardown_all(&mut ctl).await;
        ctl.close().await;
        self.transition(EngineState::Terminated);
        result
    }

    fn transition(&mut self, next: EngineState) {
        debug!(from = ?self.state, to = ?next, "Engine state change");
        self.state = next;
    }

    async fn connect(&mut self) -> EngineResult<Box<dyn LineTransport>> {
        self.transition(EngineState::Connecting);
        if let Some(transport) = self.transport.take() {
            info!(peer = %transport.peer(), "Using supplied transport");
            return Ok(transport);
        }

        let server = &self.config.server;
        let options = TransportOptions::default()
            .with_read_timeout(self.config.engine.read_timeout())
            .with_connect_timeout(self.config.engine.connect_timeout());
        let transport = TcpTransport::connect(&server.host, server.port, options)
            .await
            .map_err(|source| EngineError::Connect {
                addr: format!("{}:{}", server.host, server.port),
                source,
            })?;
        Ok(Box::new(transport.with_observer(tracing_observer())))
    }

    // ─── Login ──────────────────────────────────────────────────────────────

    async fn login(&mut self, ctl: &mut Controller) -> EngineResult<LoginOutcome> {
        self.transition(EngineState::LoggingIn);

        let identity = &self.config.identity;
        let mut lines = Vec::with_capacity(3);
        if let Some(password) = &self.config.server.password {
            lines.push(format!("PASS {password}"));
        }
        lines.push(format!("NICK {}", identity.nickname));
        lines.push(format!(
            "USER {} 0 * :{}",
            identity.username,
            identity.realname()
        ));
        ctl.send_lines(&lines)
            .await
            .map_err(|e| EngineError::Login {
                reason: format!("could not send registration: {e}"),
            })?;
        ctl.set_identity(identity.nickname.clone(), identity.username.clone());
        // nobody is loaded yet to hear about the registration lines
        ctl.clear_sent();

        ctl.request_channels(&self.config.channels);
        self.restore_channels(ctl);

        let loaded = self.dispatcher.load_all(ctl);
        info!(modules = ?loaded, "Modules loaded");

        self.await_welcome(ctl).await
    }

    fn restore_channels(&self, ctl: &mut Controller) {
        match self.store.take_joined() {
            Ok(channels) => ctl.request_channels(channels),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable channel state");
                if let Err(e) = self.store.delete() {
                    warn!(error = %e, "Failed to remove channel state");
                }
            }
        }
    }

    /// Consumes lines until the server's `004`.
    async fn await_welcome(&mut self, ctl: &mut Controller) -> EngineResult<LoginOutcome> {
        let timeout = self.config.engine.login_timeout();
        let deadline = Instant::now() + timeout;

        loop {
            if Instant::now() >= deadline {
                return Err(EngineError::LoginTimeout(timeout));
            }

            let read = ctl.read_line().map_err(|e| EngineError::Login {
                reason: e.to_string(),
            })?;

            if let Some(line) = read.as_deref().and_then(Line::parse) {
                if line.is_command("PING") {
                    let _ = ctl.send_pong(&self.local_host).await;
                } else if line.is_command("ERROR") {
                    return Err(EngineError::ProtocolFatal(error_reason(&line)));
                } else if line.is_command("004") {
                    info!(peer = %ctl.peer(), "Completed log in");
                    return Ok(LoginOutcome::Welcomed);
                }
                continue;
            }

            if self.idle(self.config.engine.tick_interval()).await {
                return Ok(LoginOutcome::Interrupted);
            }
        }
    }

    // ─── Operating ──────────────────────────────────────────────────────────

    async fn operate(&mut self, ctl: &mut Controller) -> EngineResult<Shutdown> {
        self.transition(EngineState::Operating);
        let tick = self.config.engine.tick_interval();

        loop {
            if self.shutdown.is_cancelled() {
                info!("Shutdown signal received");
                let _ = ctl.quit(SHUTDOWN_MESSAGE).await;
                return Ok(Shutdown::Signal);
            }

            let read = ctl.read_line().map_err(EngineError::ConnectionLost)?;
            if let Some(line) = read.as_deref().and_then(Line::parse) {
                match classify(line) {
                    Inbound::Ping(_) => {
                        let _ = ctl.send_pong(&self.local_host).await;
                        continue;
                    }
                    Inbound::Error(line) => {
                        return Err(EngineError::ProtocolFatal(error_reason(&line)));
                    }
                    Inbound::Ignored(line) => {
                        debug!(line = %line.raw(), "Dropping PRIVMSG without a user origin");
                    }
                    Inbound::Event(event) => self.dispatcher.dispatch(ctl, &event).await,
                }
            }

            let joined = ctl.join_pending().await;
            self.dispatcher.flush_sent(ctl).await;
            for channel in joined {
                self.dispatcher
                    .dispatch(ctl, &Event::JoinedChannel(channel))
                    .await;
            }

            self.dispatcher.dispatch(ctl, &Event::Tick).await;

            if let Some(shutdown) = self.handle_requests(ctl).await {
                return Ok(shutdown);
            }

            self.idle(tick).await;
        }
    }

    /// Sleeps for `duration` or until shutdown is signalled.
    ///
    /// Returns `true` if shutdown was signalled.
    async fn idle(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = sleep(duration) => self.shutdown.is_cancelled(),
            _ = self.shutdown.cancelled() => true,
        }
    }

    async fn handle_requests(&mut self, ctl: &mut Controller) -> Option<Shutdown> {
        for request in ctl.take_requests() {
            match request {
                ControlRequest::Reload => self.reload(ctl).await,
                ControlRequest::Restart { reason } => {
                    self.restart(ctl, &reason).await;
                    return Some(Shutdown::Restart { reason });
                }
                ControlRequest::Shutdown { reason } => {
                    info!(reason = %reason, "Shutdown requested");
                    let _ = ctl.quit(&reason).await;
                    return Some(Shutdown::Normal { reason });
                }
            }
        }
        None
    }

    async fn reload(&mut self, ctl: &mut Controller) {
        let configs = match self.reloader.as_mut().map(|reload| reload()) {
            Some(Ok(config)) => match validate_config(&config) {
                Ok(()) => {
                    let configs = config.modules.config.clone();
                    self.dispatcher.set_discovery(config.modules.discovery());
                    self.config.modules = config.modules;
                    Some(configs)
                }
                Err(e) => {
                    warn!(error = %e, "Reloaded configuration is invalid, keeping the current one");
                    None
                }
            },
            Some(Err(e)) => {
                warn!(error = %e, "Failed to reload configuration, keeping the current one");
                None
            }
            None => None,
        };

        let loaded = self.dispatcher.reload(ctl, configs).await;
        info!(modules = ?loaded, "Modules reloaded");
    }

    async fn restart(&mut self, ctl: &mut Controller, reason: &str) {
        info!(reason = %reason, "Restart requested");
        self.dispatcher
            .dispatch(ctl, &Event::RestartRequested)
            .await;

        if let Err(e) = self.store.save(&ctl.channel_snapshot()) {
            error!(error = %e, "Failed to save channel state");
        }
        let _ = ctl.quit(reason).await;
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("server", &self.config.server.host)
            .field("local_host", &self.local_host)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

fn error_reason(line: &Line) -> String {
    line.trailing().unwrap_or(line.raw()).to_string()
}

/// Best-effort local host name for `PONG`.
fn local_host_name() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!(error = %e, "Unable to determine host name");
            "localhost".to_string()
        }
    }
}

// =============================================================================
// EngineBuilder
// =============================================================================

/// Builder for an [`Engine`].
///
/// ```rust,ignore
/// let engine = Engine::builder(config)
///     .shutdown_token(token.clone())
///     .build()?;
/// let outcome = engine.run().await?;
/// ```
pub struct EngineBuilder {
    config: BrassConfig,
    transport: Option<Box<dyn LineTransport>>,
    shutdown: Option<CancellationToken>,
    reloader: Option<ConfigReloader>,
}

impl EngineBuilder {
    pub fn new(config: BrassConfig) -> Self {
        Self {
            config,
            transport: None,
            shutdown: None,
            reloader: None,
        }
    }

    /// Uses an already-open transport instead of connecting over TCP.
    pub fn transport(mut self, transport: Box<dyn LineTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Uses `token` to request a graceful shutdown.
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Re-reads configuration when a module requests a reload.
    pub fn config_reloader<F>(mut self, reload: F) -> Self
    where
        F: FnMut() -> ConfigResult<BrassConfig> + Send + 'static,
    {
        self.reloader = Some(Box::new(reload));
        self
    }

    /// Validates the configuration and builds the engine.
    pub fn build(self) -> EngineResult<Engine> {
        validate_config(&self.config)?;

        let dispatcher = ModuleDispatcher::new(self.config.modules.discovery())
            .with_configs(self.config.modules.config.clone())
            .with_deadline(self.config.engine.module_timeout());
        let local_host = self
            .config
            .engine
            .local_host
            .clone()
            .unwrap_or_else(local_host_name);

        Ok(Engine {
            store: StateStore::new(&self.config.state.snapshot_path),
            dispatcher,
            local_host,
            shutdown: self.shutdown.unwrap_or_default(),
            transport: self.transport,
            reloader: self.reloader,
            state: EngineState::Connecting,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Shutdown::Signal.exit_code(), 0);
        assert_eq!(
            Shutdown::Normal {
                reason: "bye".into()
            }
            .exit_code(),
            0
        );
        assert_eq!(
            Shutdown::Restart {
                reason: "bye".into()
            }
            .exit_code(),
            RESTART_EXIT_CODE
        );
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = BrassConfig::default();
        config.server.port = 0;
        assert!(matches!(
            Engine::builder(config).build(),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_local_host_from_config() {
        let mut config = BrassConfig::default();
        config.engine.local_host = Some("bot.example.net".into());
        let engine = Engine::builder(config).build().unwrap();
        assert_eq!(engine.local_host, "bot.example.net");
        assert_eq!(engine.state(), EngineState::Connecting);
    }
}
