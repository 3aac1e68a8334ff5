//! Registry of commands published by loaded modules.
//!
//! The registry maps a *source* (normally a module name) to the commands that
//! source responds to, each with a one-line description. It exists so that a
//! help module can describe what the bot understands; it does not route
//! anything by itself.
//!
//! Within one source a command string is unique: adding a duplicate is
//! rejected and leaves the existing description in place. Insertion order is
//! preserved so help output is stable for the lifetime of the process.

/// Source bucket for commands that are not tied to a specific module.
pub const GENERAL_SOURCE: &str = "general";

/// Ordered `source → (command → description)` mapping.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    sources: Vec<(String, Vec<(String, String)>)>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `command` under `source`.
    ///
    /// Returns `false` without modifying anything if the source already has
    /// this command.
    pub fn add(&mut self, source: &str, command: &str, description: &str) -> bool {
        let idx = match self.sources.iter().position(|(s, _)| s == source) {
            Some(idx) => idx,
            None => {
                self.sources.push((source.to_string(), Vec::new()));
                self.sources.len() - 1
            }
        };

        let commands = &mut self.sources[idx].1;
        if commands.iter().any(|(c, _)| c == command) {
            return false;
        }
        commands.push((command.to_string(), description.to_string()));
        true
    }

    /// Removes every registration of each given command string, whatever its
    /// source. Returns how many entries were removed.
    pub fn remove<I, S>(&mut self, commands: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut removed = 0;
        for command in commands {
            let command = command.as_ref();
            for (_, entries) in &mut self.sources {
                let before = entries.len();
                entries.retain(|(c, _)| c != command);
                removed += before - entries.len();
            }
        }
        self.sources.retain(|(_, entries)| !entries.is_empty());
        removed
    }

    /// Drops every command registered under `source`. Returns how many were
    /// removed.
    pub fn remove_source(&mut self, source: &str) -> usize {
        match self.sources.iter().position(|(s, _)| s == source) {
            Some(idx) => self.sources.remove(idx).1.len(),
            None => 0,
        }
    }

    /// A snapshot of every source and its commands, in registration order.
    pub fn list(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.sources.clone()
    }

    /// The commands registered under `source`, if any.
    pub fn commands_for(&self, source: &str) -> Option<&[(String, String)]> {
        self.sources
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, entries)| entries.as_slice())
    }

    /// Names of all sources with at least one command.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|(s, _)| s.as_str())
    }

    /// Total number of registered commands across all sources.
    pub fn len(&self) -> usize {
        self.sources.iter().map(|(_, e)| e.len()).sum()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_add_is_rejected() {
        let mut registry = CommandRegistry::new();
        assert!(registry.add("help", "!help", "x"));
        assert!(!registry.add("help", "!help", "y"));

        let entries = registry.commands_for("help").unwrap();
        assert_eq!(entries, &[("!help".to_string(), "x".to_string())]);
    }

    #[test]
    fn test_same_command_in_different_sources() {
        let mut registry = CommandRegistry::new();
        assert!(registry.add("a", "!go", "from a"));
        assert!(registry.add("b", "!go", "from b"));
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.remove(["!go"]), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_counts_and_prunes() {
        let mut registry = CommandRegistry::new();
        registry.add("ctl", "!memory", "m");
        registry.add("ctl", "!uptime", "u");
        registry.add(GENERAL_SOURCE, "!ping", "p");

        assert_eq!(registry.remove(["!nothing"]), 0);
        assert_eq!(registry.remove(["!memory", "!uptime"]), 2);
        assert!(registry.commands_for("ctl").is_none());
        assert_eq!(registry.sources().collect::<Vec<_>>(), vec![GENERAL_SOURCE]);
    }

    #[test]
    fn test_remove_source() {
        let mut registry = CommandRegistry::new();
        registry.add("ctl", "!memory", "m");
        registry.add("ctl", "!uptime", "u");
        registry.add("help", "!help", "h");

        assert_eq!(registry.remove_source("ctl"), 2);
        assert_eq!(registry.remove_source("ctl"), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_preserves_order() {
        let mut registry = CommandRegistry::new();
        registry.add("help", "!help", "1");
        registry.add("help", "!help general", "2");
        registry.add("ctl", "!uptime", "3");

        let listed = registry.list();
        assert_eq!(listed[0].0, "help");
        assert_eq!(listed[0].1[1].0, "!help general");
        assert_eq!(listed[1].0, "ctl");
    }
}
