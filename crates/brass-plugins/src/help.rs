//! `help`: describes the commands published in the registry.
//!
//! | Message | Reply |
//! |---------|-------|
//! | `!help` | the help commands, then every other module with commands |
//! | `!help <module>` | the commands of one module |
//! | `!help general` | commands registered without a module |
//!
//! Replies go to the channel the request came from, or back to the sender
//! for private messages.

use brass_core::GENERAL_SOURCE;
use brass_framework::prelude::*;

const NAME: &str = "help";

struct Help;

#[async_trait]
impl Module for Help {
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::of(&[Capability::ChannelMessage, Capability::PrivateMessage])
    }

    async fn on_channel_message(
        &mut self,
        ctl: &mut Controller,
        _sender: &Ident,
        channel: &str,
        text: &str,
    ) -> anyhow::Result<()> {
        if let Some(reply) = respond(ctl, text) {
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
        if let Some(reply) = respond(ctl, text) {
            reply_to(ctl, &sender.nick, &reply).await?;
        }
        Ok(())
    }
}

/// Sends each line as a `PRIVMSG`, stopping at the first failed write.
pub(crate) async fn reply_to(
    ctl: &mut Controller,
    target: &str,
    lines: &[String],
) -> anyhow::Result<()> {
    let lines: Vec<String> = lines
        .iter()
        .map(|line| format!("PRIVMSG {target} :{line}"))
        .collect();
    ctl.send_lines(lines).await?;
    Ok(())
}

fn respond(ctl: &Controller, text: &str) -> Option<Vec<String>> {
    let text = text.trim();
    if text != "!help" && !text.starts_with("!help ") {
        return None;
    }

    let nick = ctl.current_nickname();
    let registry = ctl.commands();
    let mut reply = Vec::new();

    if text == "!help" {
        reply.push(format!(
            "A brief guide to the help available with {nick}:"
        ));
        for (command, description) in registry.commands_for(NAME).unwrap_or_default() {
            reply.push(format!("  {command} - {description}"));
        }
        reply.push(format!("{nick} has the following modules installed:"));
        for source in registry.sources() {
            if source != GENERAL_SOURCE && source != NAME {
                reply.push(format!("  {source}"));
            }
        }
        return Some(reply);
    }

    if registry.is_empty() {
        reply.push(format!("{nick} does not respond to any commands."));
        return Some(reply);
    }

    let parts: Vec<&str> = text.split_whitespace().collect();
    let [_, topic] = parts.as_slice() else {
        reply.push("Invalid command.".to_string());
        return Some(reply);
    };

    if *topic == GENERAL_SOURCE {
        reply.push(format!("The following commands can be used with {nick}:"));
        for (command, description) in registry.commands_for(GENERAL_SOURCE).unwrap_or_default() {
            reply.push(format!("  {command} - {description}"));
        }
    } else if let Some(commands) = registry.commands_for(topic) {
        reply.push(format!(
            "The following commands can be used with the \"{topic}\" module of {nick}:"
        ));
        for (command, description) in commands {
            reply.push(format!("  {command} - {description}"));
        }
    } else {
        reply.push(format!(
            "The module \"{topic}\" is not currently running on {nick}."
        ));
    }
    Some(reply)
}

fn create(_config: ModuleConfig, ctl: &mut Controller) -> anyhow::Result<Box<dyn Module>> {
    ctl.register_command(NAME, "!help", "Returns this help information.");
    ctl.register_command(
        NAME,
        "!help <module>",
        "Returns help information for a currently loaded module.",
    );
    ctl.register_command(
        NAME,
        "!help general",
        "Returns help information relating to general commands.",
    );
    Ok(Box::new(Help))
}

register_module!(HELP, "help", "Lists the commands the bot understands", create);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{alice, controller};

    #[tokio::test]
    async fn test_help_overview_in_channel() {
        let (mut ctl, handle) = controller();
        let mut help = create(ModuleConfig::empty(NAME), &mut ctl).unwrap();
        ctl.register_command("bot_control", "!uptime", "Reports uptime.");
        ctl.register_command("", "!ping", "Pong.");

        help.on_channel_message(&mut ctl, &alice(), "#room", "!help")
            .await
            .unwrap();

        assert_eq!(
            handle.sent(),
            vec![
                "PRIVMSG #room :A brief guide to the help available with brassbot:",
                "PRIVMSG #room :  !help - Returns this help information.",
                "PRIVMSG #room :  !help <module> - Returns help information for a currently loaded module.",
                "PRIVMSG #room :  !help general - Returns help information relating to general commands.",
                "PRIVMSG #room :brassbot has the following modules installed:",
                "PRIVMSG #room :  bot_control",
            ]
        );
    }

    #[tokio::test]
    async fn test_help_for_module_and_general() {
        let (mut ctl, handle) = controller();
        let mut help = create(ModuleConfig::empty(NAME), &mut ctl).unwrap();
        ctl.register_command("bot_control", "!uptime", "Reports uptime.");
        ctl.register_command("", "!ping", "Pong.");

        help.on_private_message(&mut ctl, &alice(), "!help bot_control")
            .await
            .unwrap();
        help.on_private_message(&mut ctl, &alice(), "!help general")
            .await
            .unwrap();
        help.on_private_message(&mut ctl, &alice(), "!help nothing")
            .await
            .unwrap();

        assert_eq!(
            handle.sent(),
            vec![
                "PRIVMSG alice :The following commands can be used with the \"bot_control\" module of brassbot:",
                "PRIVMSG alice :  !uptime - Reports uptime.",
                "PRIVMSG alice :The following commands can be used with brassbot:",
                "PRIVMSG alice :  !ping - Pong.",
                "PRIVMSG alice :The module \"nothing\" is not currently running on brassbot.",
            ]
        );
    }

    #[tokio::test]
    async fn test_ignores_other_messages() {
        let (mut ctl, handle) = controller();
        let mut help = create(ModuleConfig::empty(NAME), &mut ctl).unwrap();

        help.on_channel_message(&mut ctl, &alice(), "#room", "hello !help")
            .await
            .unwrap();
        help.on_channel_message(&mut ctl, &alice(), "#room", "!helpful")
            .await
            .unwrap();
        assert!(handle.sent().is_empty());

        help.on_channel_message(&mut ctl, &alice(), "#room", "!help a b")
            .await
            .unwrap();
        assert_eq!(handle.sent(), vec!["PRIVMSG #room :Invalid command."]);
    }
}
