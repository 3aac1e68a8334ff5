//! Channel snapshot persisted across a graceful restart.
//!
//! The file is a JSON array of `{ "name": "#chan", "joined": true }` objects.
//! It is written just before the bot quits for a restart and consumed (read,
//! then deleted) at the next start, so a stale snapshot is never replayed
//! twice.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use brass_core::ChannelState;

use crate::error::{EngineError, EngineResult};

/// Reads and writes the channel snapshot file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the snapshot, replacing any existing file.
    pub fn save(&self, channels: &[ChannelState]) -> EngineResult<()> {
        let json = serde_json::to_vec_pretty(channels).map_err(|e| self.error(e))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }
        fs::write(&self.path, json).map_err(|e| self.error(e))?;
        info!(path = %self.path.display(), channels = channels.len(), "Saved channel state");
        Ok(())
    }

    /// Reads the snapshot without deleting it.
    ///
    /// A missing file yields `Ok(None)`.
    pub fn load(&self) -> EngineResult<Option<Vec<ChannelState>>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error(e)),
        };
        let channels = serde_json::from_slice(&bytes).map_err(|e| self.error(e))?;
        Ok(Some(channels))
    }

    /// Reads and deletes the snapshot, returning the channels that were
    /// joined when it was written.
    pub fn take_joined(&self) -> EngineResult<Vec<String>> {
        let Some(channels) = self.load()? else {
            debug!(path = %self.path.display(), "No saved channel state");
            return Ok(Vec::new());
        };
        self.delete()?;

        let joined: Vec<String> = channels
            .into_iter()
            .filter(|c| c.joined)
            .map(|c| c.name)
            .collect();
        info!(path = %self.path.display(), channels = joined.len(), "Restored channel state");
        Ok(joined)
    }

    /// Deletes the snapshot if it exists.
    pub fn delete(&self) -> EngineResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.error(e)),
        }
    }

    fn error(&self, e: impl std::fmt::Display) -> EngineError {
        EngineError::State {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(name: &str, joined: bool) -> ChannelState {
        ChannelState {
            name: name.to_string(),
            joined,
        }
    }

    #[test]
    fn test_round_trip_replays_joined_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("channelstate.json"));

        store
            .save(&[state("#a", true), state("#b", false), state("#c", true)])
            .unwrap();
        assert!(store.path().exists());

        assert_eq!(store.take_joined().unwrap(), vec!["#a", "#c"]);
        assert!(!store.path().exists());
        assert!(store.take_joined().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
        store.delete().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channelstate.json");
        fs::write(&path, "not json").unwrap();

        let store = StateStore::new(&path);
        assert!(matches!(store.take_joined(), Err(EngineError::State { .. })));
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state").join("channels.json"));
        store.save(&[state("#a", true)]).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), vec![state("#a", true)]);
    }
}
