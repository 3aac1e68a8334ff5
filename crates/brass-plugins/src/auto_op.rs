//! `auto_op`: gives channel operator status to listed users when they join.
//!
//! ```toml
//! [modules.config.auto_op]
//! "#rust" = ["alice", "bob"]
//! lobby = ["carol"]
//! ```
//!
//! Every configured channel is requested on load. Nicknames compare
//! case-insensitively.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use brass_framework::prelude::*;

struct AutoOp {
    rules: HashMap<String, Vec<String>>,
}

#[async_trait]
impl Module for AutoOp {
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::of(&[Capability::DataMessage])
    }

    async fn on_data_message(&mut self, ctl: &mut Controller, line: &Line) -> anyhow::Result<()> {
        if !line.is_command("JOIN") {
            return Ok(());
        }
        let (Some(sender), Some(channel)) = (
            line.origin_token().and_then(Controller::parse_ident),
            line.param(0),
        ) else {
            return Ok(());
        };

        let listed = self.rules.get(channel).is_some_and(|nicks| {
            nicks
                .iter()
                .any(|nick| nick.eq_ignore_ascii_case(&sender.nick))
        });
        if listed && !sender.nick.eq_ignore_ascii_case(ctl.current_nickname()) {
            debug!(channel = %channel, nick = %sender.nick, "Granting operator status");
            ctl.send_line(&format!("MODE {channel} +o {}", sender.nick))
                .await?;
        }
        Ok(())
    }
}

fn create(config: ModuleConfig, ctl: &mut Controller) -> anyhow::Result<Box<dyn Module>> {
    let config: BTreeMap<String, Vec<String>> = config.parse()?;

    let mut rules = HashMap::new();
    for (channel, nicks) in config {
        let channel = Controller::canonicalize_channel_name(&channel);
        ctl.request_channel(&channel);
        rules
            .entry(channel)
            .or_insert_with(Vec::new)
            .extend(nicks);
    }
    Ok(Box::new(AutoOp { rules }))
}

register_module!(
    AUTO_OP,
    "auto_op",
    "Gives operator status to listed users on join",
    create
);
