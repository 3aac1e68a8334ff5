//! `bot_control`: status and lifecycle commands.
//!
//! `!memory` and `!uptime` answer anyone. `!restart` and `!reload` are
//! honored only for the operators listed in the module configuration:
//!
//! ```toml
//! [modules.config.bot_control]
//! operators = ["alice", "bob!bob@staff.example.org"]
//! ```
//!
//! An operator entry matches either the nickname (case-insensitively) or the
//! full `nick!user@host` ident. The bot also joins any channel it is invited
//! to.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use brass_framework::prelude::*;

use crate::help::reply_to;

const NAME: &str = "bot_control";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BotControlConfig {
    operators: Vec<String>,
}

struct BotControl {
    operators: Vec<String>,
}

impl BotControl {
    fn is_operator(&self, sender: &Ident) -> bool {
        let ident = sender.full.trim_start_matches(':');
        self.operators
            .iter()
            .any(|op| op.eq_ignore_ascii_case(&sender.nick) || op == ident)
    }

    async fn respond(
        &self,
        ctl: &mut Controller,
        sender: &Ident,
        text: &str,
    ) -> Option<Vec<String>> {
        let reply = match text.trim() {
            "!memory" => memory_report().await,
            "!uptime" => vec![format!("Uptime: {}.", format_uptime(ctl.uptime()))],
            "!restart" if self.is_operator(sender) => {
                info!(operator = %sender.nick, "Restart requested");
                ctl.request_restart(format!("Restart requested by {}", sender.nick));
                vec!["Restarting.".to_string()]
            }
            "!reload" if self.is_operator(sender) => {
                info!(operator = %sender.nick, "Module reload requested");
                ctl.request_reload();
                vec!["Reloading modules.".to_string()]
            }
            "!restart" | "!reload" => vec!["You are not allowed to do that.".to_string()],
            _ => return None,
        };
        Some(reply)
    }
}

#[async_trait]
impl Module for BotControl {
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::of(&[
            Capability::ChannelMessage,
            Capability::PrivateMessage,
            Capability::DataMessage,
        ])
    }

    async fn on_channel_message(
        &mut self,
        ctl: &mut Controller,
        sender: &Ident,
        channel: &str,
        text: &str,
    ) -> anyhow::Result<()> {
        if let Some(reply) = self.respond(ctl, sender, text).await {
            reply_to(ctl, channel, &reply).await?;
        }
        Ok(())
    }

    async fn on_private_message(
        &mut self,
        ctl: &mut Controller,
        sender: &Ident,
        text: &str,
    ) -> anyhow::Result<()> {
        if let Some(reply) = self.respond(ctl, sender, text).await {
            reply_to(ctl, &sender.nick, &reply).await?;
        }
        Ok(())
    }

    async fn on_data_message(&mut self, ctl: &mut Controller, line: &Line) -> anyhow::Result<()> {
        if line.is_command("INVITE")
            && let Some(channel) = line.param(1)
        {
            info!(channel = %channel, by = ?line.prefix(), "Invited to channel");
            ctl.request_channel(channel);
        }
        Ok(())
    }
}

/// `D days H hours MM minutes SS seconds`.
fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = total % 86_400 / 3_600;
    let minutes = total % 3_600 / 60;
    let seconds = total % 60;
    format!("{days} days {hours} hours {minutes:02} minutes {seconds:02} seconds")
}

/// Scales a byte count to the largest unit that keeps it at or above one.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["b", "kb", "mb", "gb", "tb", "pb"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

/// Reads `VmRSS` and `VmHWM` (in kB) from a `/proc/<pid>/status` dump.
fn parse_proc_status(status: &str) -> Option<(u64, u64)> {
    let field = |name: &str| -> Option<u64> {
        let line = status.lines().find(|l| l.starts_with(name))?;
        let kb = line.split_whitespace().nth(1)?.parse::<u64>().ok()?;
        Some(kb * 1024)
    };
    Some((field("VmRSS:")?, field("VmHWM:")?))
}

async fn memory_report() -> Vec<String> {
    let status = tokio::fs::read_to_string("/proc/self/status").await.ok();
    match status.as_deref().and_then(parse_proc_status) {
        Some((current, peak)) => vec![
            format!("Current memory use: {}", format_bytes(current)),
            format!("Peak memory use: {}", format_bytes(peak)),
        ],
        None => vec!["Memory statistics are not available on this system.".to_string()],
    }
}

fn create(config: ModuleConfig, ctl: &mut Controller) -> anyhow::Result<Box<dyn Module>> {
    let config: BotControlConfig = config.parse()?;

    ctl.register_command(
        NAME,
        "!memory",
        "Reports the current and peak memory usage of the bot.",
    );
    ctl.register_command(NAME, "!uptime", "Reports the current uptime of the bot.");
    ctl.register_command(NAME, "!restart", "Restarts the bot (operators only).");
    ctl.register_command(NAME, "!reload", "Reloads every module (operators only).");

    Ok(Box::new(BotControl {
        operators: config.operators,
    }))
}

register_module!(
    BOT_CONTROL,
    "bot_control",
    "Status, restart and reload commands",
    create
);
