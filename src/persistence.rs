//! Persistence of the last play intent.
//!
//! The player records `play_when_ready` on every change so the surrounding
//! application can restore it when a session is resumed.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::warn;

const STATE_FILE_NAME: &str = "cast_state.toml";

pub trait PlayIntentStore {
    fn load_play_intent(&self) -> bool;
    fn store_play_intent(&mut self, play_when_ready: bool) -> Result<(), String>;
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
struct CastStateFile {
    #[serde(default)]
    play_when_ready: bool,
}

/// Stores the intent in `<config_dir>/<app_key>/cast_state.toml`.
#[derive(Debug, Clone)]
pub struct FilePlayIntentStore {
    path: PathBuf,
}

impl FilePlayIntentStore {
    /// Store keyed by application under the platform config directory.
    pub fn for_app(app_key: &str) -> Result<Self, String> {
        let config_root = dirs::config_dir()
            .ok_or_else(|| "no platform config directory available".to_string())?;
        Ok(Self::at_path(config_root.join(app_key).join(STATE_FILE_NAME)))
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_state(&self) -> Option<CastStateFile> {
        let contents = fs::read_to_string(&self.path).ok()?;
        match toml::from_str::<CastStateFile>(&contents) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(
                    "PlayIntentStore: failed parsing {}: {}",
                    self.path.display(),
                    err
                );
                None
            }
        }
    }
}

impl PlayIntentStore for FilePlayIntentStore {
    fn load_play_intent(&self) -> bool {
        self.read_state()
            .map(|state| state.play_when_ready)
            .unwrap_or(false)
    }

    fn store_play_intent(&mut self, play_when_ready: bool) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "failed to create state directory {}: {err}",
                    parent.display()
                )
            })?;
        }
        let serialized = toml::to_string(&CastStateFile { play_when_ready })
            .map_err(|err| format!("failed to serialize cast state: {err}"))?;
        fs::write(&self.path, serialized)
            .map_err(|err| format!("failed to write {}: {err}", self.path.display()))
    }
}

/// In-memory store; clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct MemoryPlayIntentStore {
    value: Rc<Cell<bool>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryPlayIntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes seen so far.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl PlayIntentStore for MemoryPlayIntentStore {
    fn load_play_intent(&self) -> bool {
        self.value.get()
    }

    fn store_play_intent(&mut self, play_when_ready: bool) -> Result<(), String> {
        self.value.set(play_when_ready);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}
