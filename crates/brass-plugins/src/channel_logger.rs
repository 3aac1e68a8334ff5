//! `channel_logger`: writes channel activity to daily log files.
//!
//! ```toml
//! [modules.config.channel_logger]
//! directory = "logs"
//! channels = ["#rust", "lobby"]
//! ```
//!
//! Each logged channel gets `<directory>/<#channel>/<YYYYMMDD>.log`, one
//! `[HH:MM:SS] text` line per entry. Logged: chat (including the bot's own
//! channel messages and `/me` actions), joins, parts, quits, kicks, op and
//! voice changes and topic changes.
//!
//! Logging can be switched per channel at runtime with `!startlog #channel`
//! and `!stoplog #channel` sent to the bot privately; both also join or
//! leave the channel.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use time::OffsetDateTime;
use time::macros::format_description;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use brass_framework::prelude::*;

const NAME: &str = "channel_logger";

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ChannelLoggerConfig {
    directory: PathBuf,
    channels: Vec<String>,
}

impl Default for ChannelLoggerConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            channels: Vec::new(),
        }
    }
}

struct ChannelLogger {
    directory: PathBuf,
    channels: Vec<String>,
    /// Nicks known to be present, per channel; used to attribute quits.
    users: HashMap<String, Vec<String>>,
}

impl ChannelLogger {
    fn is_logging(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c == channel)
    }

    async fn write(&self, channel: &str, entry: &str) -> anyhow::Result<()> {
        if !self.is_logging(channel) {
            return Ok(());
        }

        let now = now();
        let day = now.format(format_description!("[year][month][day]"))?;
        let clock = now.format(format_description!("[hour]:[minute]:[second]"))?;

        anyhow::ensure!(
            is_safe_channel_dir(channel),
            "refusing to log {channel:?} outside the log directory"
        );
        let dir = self.directory.join(channel);
        tokio::fs::create_dir_all(&dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(format!("{day}.log")))
            .await?;
        file.write_all(format!("[{clock}] {entry}\n").as_bytes())
            .await?;
        file.flush().await?;
        Ok(())
    }

    fn add_user(&mut self, channel: &str, nick: &str) {
        let users = self.users.entry(channel.to_string()).or_default();
        if !users.iter().any(|u| u == nick) {
            users.push(nick.to_string());
        }
    }

    fn remove_user(&mut self, channel: &str, nick: &str) {
        if let Some(users) = self.users.get_mut(channel) {
            users.retain(|u| u != nick);
        }
    }

    async fn log_event(&mut self, line: &Line) -> anyhow::Result<()> {
        let actor = line
            .origin_token()
            .and_then(Controller::parse_ident)
            .map(|ident| ident.nick)
            .unwrap_or_default();
        let param = |i| line.param(i).unwrap_or_default();

        match line.command() {
            "JOIN" => {
                let channel = param(0);
                self.add_user(channel, &actor);
                self.write(channel, &format!("[{actor} joined chat]")).await
            }
            "PART" => {
                let channel = param(0);
                self.remove_user(channel, &actor);
                self.write(channel, &format!("[{actor} left chat]")).await
            }
            "QUIT" => {
                let reason = param(0);
                let present: Vec<String> = self
                    .users
                    .iter()
                    .filter(|(_, users)| users.iter().any(|u| *u == actor))
                    .map(|(channel, _)| channel.clone())
                    .collect();
                for channel in present {
                    self.remove_user(&channel, &actor);
                    self.write(&channel, &format!("[{actor} quit IRC: {reason}]"))
                        .await?;
                }
                Ok(())
            }
            "KICK" => {
                let (channel, victim) = (param(0), param(1));
                self.remove_user(channel, victim);
                let entry = format!("[{actor} kicked {victim}: '{}']", param(2));
                self.write(channel, &entry).await
            }
            "MODE" => {
                let (channel, target) = (param(0), param(2));
                let action = match param(1) {
                    "+o" => "gave channel operator status to",
                    "-o" => "removed channel operator status from",
                    "+v" => "gave voice to",
                    "-v" => "removed voice from",
                    _ => return Ok(()),
                };
                self.write(channel, &format!("[{actor} {action} {target}]"))
                    .await
            }
            "TOPIC" => {
                let entry = format!("[{actor} set the topic to: {}]", param(1));
                self.write(param(0), &entry).await
            }
            // RPL_NAMREPLY: <me> <type> <#channel> :<[@+]nick> ...
            "353" => {
                let channel = param(2).to_string();
                for name in param(3).split_whitespace() {
                    let nick = name.trim_start_matches(['@', '+']);
                    self.add_user(&channel, nick);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Module for ChannelLogger {
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::of(&[
            Capability::ChannelMessage,
            Capability::PrivateMessage,
            Capability::DataMessage,
            Capability::JoinChannel,
            Capability::SendMessage,
        ])
    }

    async fn on_join_channel(&mut self, _ctl: &mut Controller, channel: &str) -> anyhow::Result<()> {
        self.users.insert(channel.to_string(), Vec::new());
        Ok(())
    }

    async fn on_private_message(
        &mut self,
        ctl: &mut Controller,
        sender: &Ident,
        text: &str,
    ) -> anyhow::Result<()> {
        if let Some(channel) = text.strip_prefix("!startlog #") {
            let channel = format!("#{}", channel.trim());
            if !is_safe_channel_dir(&channel) {
                warn!(channel = %channel, by = %sender.nick, "Refusing to log channel");
                return Ok(());
            }
            if !self.is_logging(&channel) {
                info!(channel = %channel, by = %sender.nick, "Starting channel log");
                self.channels.push(channel.clone());
            }
            ctl.request_channel(&channel);
        } else if let Some(channel) = text.strip_prefix("!stoplog #") {
            let channel = format!("#{}", channel.trim());
            if self.is_logging(&channel) {
                info!(channel = %channel, by = %sender.nick, "Stopping channel log");
                self.channels.retain(|c| *c != channel);
                self.users.remove(&channel);
                ctl.release_channel(&channel).await;
            }
        }
        Ok(())
    }

    async fn on_channel_message(
        &mut self,
        _ctl: &mut Controller,
        sender: &Ident,
        channel: &str,
        text: &str,
    ) -> anyhow::Result<()> {
        let entry = match action_text(text) {
            Some(action) => format!("* {} {action}", sender.nick),
            None => format!("{}: {}", sender.nick, text.trim()),
        };
        self.write(channel, &entry).await
    }

    async fn on_send_message(&mut self, ctl: &mut Controller, line: &str) -> anyhow::Result<()> {
        let Some(line) = Line::parse(line) else {
            return Ok(());
        };
        if let (true, Some(channel), Some(text)) = (
            line.is_command("PRIVMSG"),
            line.param(0).filter(|t| t.starts_with('#')),
            line.param(1),
        ) {
            let entry = format!("{}: {text}", ctl.current_nickname());
            self.write(channel, &entry).await?;
        }
        Ok(())
    }

    async fn on_data_message(&mut self, _ctl: &mut Controller, line: &Line) -> anyhow::Result<()> {
        self.log_event(line).await
    }

    async fn teardown(&mut self, _ctl: &mut Controller) -> anyhow::Result<()> {
        debug!(channels = ?self.channels, "Channel logger stopped");
        Ok(())
    }
}

/// Body of a CTCP `ACTION` (`/me`), if `text` is one.
fn action_text(text: &str) -> Option<&str> {
    let body = text.strip_prefix("\u{1}ACTION")?;
    Some(body.trim_end_matches('\u{1}').trim())
}

/// Returns `true` if `channel` maps to exactly one directory below the log
/// directory.
fn is_safe_channel_dir(channel: &str) -> bool {
    !channel.is_empty()
        && channel != "."
        && channel != ".."
        && !channel.contains(['/', '\\', '\0'])
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn create(config: ModuleConfig, ctl: &mut Controller) -> anyhow::Result<Box<dyn Module>> {
    let config: ChannelLoggerConfig = config.parse()?;

    let mut channels = Vec::new();
    for channel in &config.channels {
        let channel = Controller::canonicalize_channel_name(channel);
        if is_safe_channel_dir(&channel) {
            channels.push(channel);
        } else {
            warn!(channel = %channel, "Skipping channel that cannot be logged");
        }
    }
    ctl.request_channels(&channels);

    ctl.register_command(
        NAME,
        "!startlog <#channel>",
        "Makes the bot join the specified channel and start logging.",
    );
    ctl.register_command(
        NAME,
        "!stoplog <#channel>",
        "Makes the bot stop logging and leave the specified channel.",
    );

    Ok(Box::new(ChannelLogger {
        directory: config.directory,
        channels,
        users: HashMap::new(),
    }))
}

register_module!(
    CHANNEL_LOGGER,
    "channel_logger",
    "Logs channel activity to daily files",
    create
);

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::testing::{alice, controller, ident};

    fn logger(ctl: &mut Controller, dir: &Path) -> Box<dyn Module> {
        let config = ModuleConfig::new(
            NAME,
            serde_json::json!({ "directory": dir, "channels": ["rust"] }),
        );
        create(config, ctl).unwrap()
    }

    /// Lines of the single log file for `channel`, timestamps stripped.
    fn read_log(dir: &Path, channel: &str) -> Vec<String> {
        let channel_dir = dir.join(channel);
        let Ok(entries) = std::fs::read_dir(&channel_dir) else {
            return Vec::new();
        };
        let files: Vec<_> = entries.map(|e| e.unwrap().path()).collect();
        assert_eq!(files.len(), 1, "expected one log file in {channel_dir:?}");
        std::fs::read_to_string(&files[0])
            .unwrap()
            .lines()
            .map(|l| {
                assert!(l.starts_with('['), "missing timestamp: {l}");
                l[11..].to_string()
            })
            .collect()
    }

    async fn data(module: &mut Box<dyn Module>, ctl: &mut Controller, raw: &str) {
        let line = Line::parse(raw).unwrap();
        module.on_data_message(ctl, &line).await.unwrap();
    }

    #[tokio::test]
    async fn test_logs_chat_and_own_messages() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctl, _handle) = controller();
        let mut module = logger(&mut ctl, dir.path());
        assert!(ctl.channels().contains("#rust"));

        module
            .on_channel_message(&mut ctl, &alice(), "#rust", "hello there ")
            .await
            .unwrap();
        module
            .on_channel_message(&mut ctl, &alice(), "#rust", "\u{1}ACTION waves\u{1}")
            .await
            .unwrap();
        module
            .on_channel_message(&mut ctl, &alice(), "#other", "not logged")
            .await
            .unwrap();
        module
            .on_send_message(&mut ctl, "PRIVMSG #rust :hi alice")
            .await
            .unwrap();
        module
            .on_send_message(&mut ctl, "PRIVMSG alice :private")
            .await
            .unwrap();

        assert_eq!(
            read_log(dir.path(), "#rust"),
            vec!["alice: hello there", "* alice waves", "brassbot: hi alice"]
        );
        assert!(!dir.path().join("#other").exists());
    }

    #[tokio::test]
    async fn test_logs_channel_events() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctl, _handle) = controller();
        let mut module = logger(&mut ctl, dir.path());

        module.on_join_channel(&mut ctl, "#rust").await.unwrap();
        data(&mut module, &mut ctl, ":irc.test 353 brassbot = #rust :@alice +bob carol").await;
        data(&mut module, &mut ctl, ":dave!d@example.org JOIN :#rust").await;
        data(&mut module, &mut ctl, ":alice!a@example.org MODE #rust +o dave").await;
        data(&mut module, &mut ctl, ":alice!a@example.org TOPIC #rust :Rust talk").await;
        data(&mut module, &mut ctl, ":alice!a@example.org KICK #rust carol :spam").await;
        data(&mut module, &mut ctl, ":bob!b@example.org QUIT :Ping timeout").await;
        data(&mut module, &mut ctl, ":carol!c@example.org QUIT :bye").await;
        data(&mut module, &mut ctl, ":dave!d@example.org PART #rust").await;

        assert_eq!(
            read_log(dir.path(), "#rust"),
            vec![
                "[dave joined chat]",
                "[alice gave channel operator status to dave]",
                "[alice set the topic to: Rust talk]",
                "[alice kicked carol: 'spam']",
                "[bob quit IRC: Ping timeout]",
                "[dave left chat]",
            ]
        );
    }

    #[tokio::test]
    async fn test_start_and_stop_log_commands() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctl, handle) = controller();
        let mut module = logger(&mut ctl, dir.path());
        let op = ident("op");

        module
            .on_private_message(&mut ctl, &op, "!startlog #lobby")
            .await
            .unwrap();
        assert!(ctl.channels().contains("#lobby"));
        ctl.join_pending().await;

        module
            .on_channel_message(&mut ctl, &alice(), "#lobby", "logged")
            .await
            .unwrap();
        module
            .on_private_message(&mut ctl, &op, "!stoplog #lobby")
            .await
            .unwrap();
        module
            .on_channel_message(&mut ctl, &alice(), "#lobby", "not logged")
            .await
            .unwrap();

        assert_eq!(read_log(dir.path(), "#lobby"), vec!["alice: logged"]);
        assert!(!ctl.channels().contains("#lobby"));
        assert!(handle.sent().contains(&"PART #lobby".to_string()));
    }

    #[tokio::test]
    async fn test_entries_are_complete_and_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctl, _handle) = controller();
        let mut module = logger(&mut ctl, dir.path());

        let expected: Vec<String> = (0..200).map(|i| format!("alice: line {i}")).collect();
        for i in 0..200 {
            module
                .on_channel_message(&mut ctl, &alice(), "#rust", &format!("line {i}"))
                .await
                .unwrap();
        }
        assert_eq!(read_log(dir.path(), "#rust"), expected);
    }

    #[tokio::test]
    async fn test_startlog_rejects_names_outside_log_directory() {
        let root = tempfile::tempdir().unwrap();
        let logs = root.path().join("logs");
        let (mut ctl, handle) = controller();
        let mut module = logger(&mut ctl, &logs);

        module
            .on_private_message(&mut ctl, &ident("op"), "!startlog #x/../../escaped")
            .await
            .unwrap();
        assert!(!ctl.channels().contains("#x/../../escaped"));
        ctl.join_pending().await;
        assert!(!handle.sent().iter().any(|l| l.contains("escaped")));

        module
            .on_channel_message(&mut ctl, &alice(), "#x/../../escaped", "hello")
            .await
            .unwrap();
        assert!(!root.path().join("escaped").exists());
        assert!(!logs.exists());
    }

    #[test]
    fn test_safe_channel_dir() {
        assert!(is_safe_channel_dir("#rust"));
        assert!(is_safe_channel_dir("#c++"));
        assert!(!is_safe_channel_dir("#a/b"));
        assert!(!is_safe_channel_dir("#a\\b"));
        assert!(!is_safe_channel_dir(".."));
    }

    #[test]
    fn test_action_text() {
        assert_eq!(action_text("\u{1}ACTION dances\u{1}"), Some("dances"));
        assert_eq!(action_text("ACTION dances"), None);
    }
}
