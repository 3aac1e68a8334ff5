//! The handle modules use to act on the connection.
//!
//! A [`Controller`] owns the transport, the channel tracker and the command
//! registry for the lifetime of one connection. The engine lends it to every
//! module hook as `&mut Controller`, so all state changes happen on the single
//! engine task, one hook at a time.
//!
//! Outbound lines that were written successfully are queued as pending
//! send notifications. The dispatcher drains that queue after each hook
//! returns and reports the lines to modules that declared
//! [`Capability::SendMessage`](brass_core::Capability::SendMessage).

use std::collections::VecDeque;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, info, warn};

use brass_core::{ChannelState, ChannelTracker, CommandRegistry, GENERAL_SOURCE, Ident};
use brass_transport::{LineTransport, TransportError, TransportResult};

/// A request a module made that only the engine can carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    /// Persist state, quit and exit for the supervisor to relaunch.
    Restart {
        /// Quit message.
        reason: String,
    },
    /// Tear down and reload every module.
    Reload,
    /// Quit and exit normally.
    Shutdown {
        /// Quit message.
        reason: String,
    },
}

/// Nickname and username the bot logged in with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// Nickname sent with `NICK`.
    pub nickname: String,
    /// Username sent with `USER`.
    pub username: String,
}

/// Connection-scoped state shared between the engine and modules.
pub struct Controller {
    transport: Box<dyn LineTransport>,
    channels: ChannelTracker,
    commands: CommandRegistry,
    identity: Identity,
    started_at: SystemTime,
    started: Instant,
    sent: VecDeque<String>,
    requests: Vec<ControlRequest>,
}

impl Controller {
    /// Creates a controller around an open transport.
    pub fn new(transport: Box<dyn LineTransport>) -> Self {
        Self {
            transport,
            channels: ChannelTracker::new(),
            commands: CommandRegistry::new(),
            identity: Identity::default(),
            started_at: SystemTime::now(),
            started: Instant::now(),
            sent: VecDeque::new(),
            requests: Vec::new(),
        }
    }

    // ─── Sending ────────────────────────────────────────────────────────────

    /// Writes one line to the server.
    ///
    /// Failures are logged here; the caller decides whether they matter.
    pub async fn send_line(&mut self, line: &str) -> TransportResult<()> {
        match self.transport.write_line(line).await {
            Ok(()) => {
                self.sent.push_back(line.trim().to_string());
                Ok(())
            }
            Err(e) => {
                warn!(line = %line.trim(), error = %e, "Error talking to server");
                Err(e)
            }
        }
    }

    /// Writes several lines in order, stopping at the first failure.
    ///
    /// Returns the number of lines written. Lines after a failed write are
    /// never attempted.
    pub async fn send_lines<I, S>(&mut self, lines: I) -> TransportResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut written = 0;
        for line in lines {
            self.send_line(line.as_ref()).await?;
            written += 1;
        }
        Ok(written)
    }

    /// Sends a `PRIVMSG` to a channel or nick.
    pub async fn say(&mut self, target: &str, text: &str) -> TransportResult<()> {
        self.send_line(&format!("PRIVMSG {target} :{text}")).await
    }

    /// Answers a keepalive `PING`.
    ///
    /// Keepalive traffic is not reported to `on_send_message` hooks.
    pub async fn send_pong(&mut self, local_host: &str) -> TransportResult<()> {
        self.transport
            .write_line(&format!("PONG {local_host}"))
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to answer PING"))
    }

    // ─── Channels ───────────────────────────────────────────────────────────

    /// Asks the engine to join a channel on the next tick.
    pub fn request_channel(&mut self, name: &str) {
        self.channels.request([name]);
    }

    /// Asks the engine to join several channels on the next tick.
    pub fn request_channels<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.channels.request(names);
    }

    /// Stops tracking a channel, parting it if it was joined.
    pub async fn release_channel(&mut self, name: &str) {
        self.release_channels([name]).await;
    }

    /// Stops tracking channels, parting each one that was joined.
    pub async fn release_channels<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for channel in self.channels.release(names) {
            if self.send_line(&format!("PART {channel}")).await.is_ok() {
                info!(channel = %channel, "Left channel");
            }
        }
    }

    /// Issues `JOIN` for every pending channel and returns those joined.
    ///
    /// A channel whose `JOIN` could not be written stays pending and is
    /// retried on the next call.
    pub async fn join_pending(&mut self) -> Vec<String> {
        let mut joined = Vec::new();
        for channel in self.channels.reconcile_pending() {
            match self.send_line(&format!("JOIN {channel}")).await {
                Ok(()) => {
                    info!(channel = %channel, "Joined channel");
                    joined.push(channel);
                }
                Err(_) => self.channels.mark_pending(&channel),
            }
        }
        joined
    }

    /// Channels a join has been issued for, in request order.
    pub fn joined_channels(&self) -> Vec<String> {
        self.channels.joined()
    }

    /// Returns `true` if the channel is tracked and joined.
    pub fn is_in_channel(&self, name: &str) -> bool {
        self.channels.is_joined(name)
    }

    /// Every tracked channel with its status.
    pub fn channel_snapshot(&self) -> Vec<ChannelState> {
        self.channels.snapshot()
    }

    /// Read access to the channel tracker.
    pub fn channels(&self) -> &ChannelTracker {
        &self.channels
    }

    // ─── Commands ───────────────────────────────────────────────────────────

    /// Publishes a command under `source`. Returns `false` on a duplicate.
    ///
    /// An empty `source` files the command under [`GENERAL_SOURCE`].
    pub fn register_command(&mut self, source: &str, command: &str, description: &str) -> bool {
        let source = if source.is_empty() { GENERAL_SOURCE } else { source };
        let added = self.commands.add(source, command, description);
        if !added {
            debug!(source = %source, command = %command, "Duplicate command ignored");
        }
        added
    }

    /// Removes a command from every source.
    pub fn unregister_command(&mut self, command: &str) -> usize {
        self.commands.remove([command])
    }

    /// Removes several commands from every source.
    pub fn unregister_commands<I, S>(&mut self, commands: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.commands.remove(commands)
    }

    /// Snapshot of every source and its commands.
    pub fn list_commands(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.commands.list()
    }

    /// Read access to the command registry.
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub(crate) fn commands_mut(&mut self) -> &mut CommandRegistry {
        &mut self.commands
    }

    // ─── Identity and helpers ───────────────────────────────────────────────

    /// The nickname the bot logged in with.
    pub fn current_nickname(&self) -> &str {
        &self.identity.nickname
    }

    /// The username the bot logged in with.
    pub fn current_username(&self) -> &str {
        &self.identity.username
    }

    /// Records the login identity.
    pub fn set_identity(&mut self, nickname: impl Into<String>, username: impl Into<String>) {
        self.identity = Identity {
            nickname: nickname.into(),
            username: username.into(),
        };
    }

    /// See [`brass_core::parse_ident`].
    pub fn parse_ident(token: &str) -> Option<Ident> {
        brass_core::parse_ident(token)
    }

    /// See [`brass_core::canonicalize_channel_name`].
    pub fn canonicalize_channel_name(name: &str) -> String {
        brass_core::canonicalize_channel_name(name)
    }

    /// Wall-clock time this controller was created.
    pub fn startup_timestamp(&self) -> SystemTime {
        self.started_at
    }

    /// Time elapsed since startup.
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Returns `true` while the transport is connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    // ─── Control requests ───────────────────────────────────────────────────

    /// Asks the engine to restart once the current tick completes.
    pub fn request_restart(&mut self, reason: impl Into<String>) {
        self.requests.push(ControlRequest::Restart {
            reason: reason.into(),
        });
    }

    /// Asks the engine to reload every module once the current tick completes.
    pub fn request_reload(&mut self) {
        self.requests.push(ControlRequest::Reload);
    }

    /// Asks the engine to quit once the current tick completes.
    pub fn request_shutdown(&mut self, reason: impl Into<String>) {
        self.requests.push(ControlRequest::Shutdown {
            reason: reason.into(),
        });
    }

    /// Takes all queued control requests.
    pub fn take_requests(&mut self) -> Vec<ControlRequest> {
        std::mem::take(&mut self.requests)
    }

    // ─── Engine side ────────────────────────────────────────────────────────

    /// Takes the oldest pending send notification.
    pub fn pop_sent(&mut self) -> Option<String> {
        self.sent.pop_front()
    }

    /// Drops all pending send notifications.
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    /// Non-blocking read of the next inbound line.
    pub fn read_line(&mut self) -> TransportResult<Option<String>> {
        self.transport.read_line()
    }

    /// Closes the transport.
    pub async fn close(&mut self) {
        self.transport.close().await;
    }

    /// Description of the remote peer.
    pub fn peer(&self) -> String {
        self.transport.peer()
    }

    /// Writes `QUIT :<reason>`, ignoring the outcome beyond logging it.
    pub async fn quit(&mut self, reason: &str) -> Result<(), TransportError> {
        self.send_line(&format!("QUIT :{reason}")).await
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("peer", &self.transport.peer())
            .field("identity", &self.identity)
            .field("channels", &self.channels.len())
            .field("commands", &self.commands.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use brass_transport::{MemoryHandle, MemoryTransport};

    use super::*;

    fn controller() -> (Controller, MemoryHandle) {
        let (transport, handle) = MemoryTransport::pair();
        (Controller::new(Box::new(transport)), handle)
    }

    #[tokio::test]
    async fn test_send_lines_aborts_batch_on_failure() {
        let (mut ctl, handle) = controller();
        handle.fail_once("B");

        let result = ctl.send_lines(["PRIVMSG #x :A", "PRIVMSG #x :B", "PRIVMSG #x :C"]).await;
        assert!(result.is_err());
        assert_eq!(handle.sent(), vec!["PRIVMSG #x :A".to_string()]);

        // The next batch is unaffected.
        assert_eq!(ctl.send_lines(["PRIVMSG #x :D"]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_successful_sends_are_queued_for_notification() {
        let (mut ctl, handle) = controller();
        handle.fail_once("two");

        ctl.send_line("one").await.unwrap();
        assert!(ctl.send_line("two").await.is_err());
        ctl.send_pong("host").await.unwrap();

        assert_eq!(ctl.pop_sent().as_deref(), Some("one"));
        assert_eq!(ctl.pop_sent(), None);
        assert_eq!(handle.sent(), vec!["one".to_string(), "PONG host".to_string()]);
    }

    #[tokio::test]
    async fn test_join_pending_retries_failed_join() {
        let (mut ctl, handle) = controller();
        ctl.request_channels(["foo", "#foo", "bar"]);
        assert_eq!(ctl.channels().len(), 2);

        handle.fail_once("JOIN #bar");
        assert_eq!(ctl.join_pending().await, vec!["#foo".to_string()]);
        assert!(!ctl.is_in_channel("#bar"));

        assert_eq!(ctl.join_pending().await, vec!["#bar".to_string()]);
        assert!(ctl.join_pending().await.is_empty());
        assert_eq!(
            handle.sent(),
            vec!["JOIN #foo".to_string(), "JOIN #bar".to_string()]
        );
    }

    #[tokio::test]
    async fn test_release_parts_joined_channels_only() {
        let (mut ctl, handle) = controller();
        ctl.request_channel("#a");
        ctl.join_pending().await;
        ctl.request_channel("#b");
        handle.take_sent();

        ctl.release_channels(["a", "#b"]).await;
        assert_eq!(handle.sent(), vec!["PART #a".to_string()]);
        assert!(ctl.channels().is_empty());
    }

    #[test]
    fn test_register_command_duplicate() {
        let (mut ctl, _handle) = controller();
        assert!(ctl.register_command("help", "!help", "x"));
        assert!(!ctl.register_command("help", "!help", "y"));
        assert_eq!(ctl.commands().commands_for("help").unwrap().len(), 1);

        assert!(ctl.register_command("", "!ping", "p"));
        assert!(ctl.commands().commands_for(GENERAL_SOURCE).is_some());
        assert_eq!(ctl.unregister_commands(["!help", "!ping"]), 2);
    }

    #[test]
    fn test_quit_then_close() {
        let (mut ctl, handle) = controller();
        tokio_test::block_on(async {
            ctl.quit("Restarting").await.unwrap();
            ctl.close().await;
        });
        assert_eq!(handle.sent(), vec!["QUIT :Restarting".to_string()]);
        assert!(handle.is_closed());
        assert!(!ctl.is_connected());
    }

    #[test]
    fn test_control_requests_are_drained() {
        let (mut ctl, _handle) = controller();
        ctl.request_reload();
        ctl.request_restart("bye");
        assert_eq!(
            ctl.take_requests(),
            vec![
                ControlRequest::Reload,
                ControlRequest::Restart {
                    reason: "bye".to_string()
                }
            ]
        );
        assert!(ctl.take_requests().is_empty());
    }
}
