// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::sound::{clamp_volume, Sound};

mod error;

pub use error::StoreError;

/// Global volume used when nothing has been persisted.
pub const DEFAULT_GLOBAL_VOLUME: f32 = 1.0;

/// Everything the soundboard persists between sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub sounds: Vec<Sound>,
    #[serde(rename = "globalVolume")]
    pub global_volume: f32,
}

impl Default for PersistedState {
    fn default() -> Self {
        PersistedState {
            sounds: Vec::new(),
            global_volume: DEFAULT_GLOBAL_VOLUME,
        }
    }
}

impl PersistedState {
    /// Parses persisted state leniently: a missing or non-array `sounds` is empty, malformed
    /// sound entries are skipped, and a missing or non-numeric `globalVolume` is the default.
    /// Only text that isn't JSON at all is an error.
    pub fn from_json(text: &str) -> Result<PersistedState, StoreError> {
        let value: Value = serde_json::from_str(text)?;

        let sounds = match value.get("sounds") {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| match Sound::deserialize(entry) {
                    Ok(mut sound) => {
                        sound.repair();
                        Some(sound)
                    }
                    Err(e) => {
                        warn!(err = %e, "Skipping malformed sound entry");
                        None
                    }
                })
                .collect(),
            Some(_) => {
                warn!("Persisted sounds is not a list, ignoring");
                Vec::new()
            }
            None => Vec::new(),
        };

        let global_volume = value
            .get("globalVolume")
            .and_then(Value::as_f64)
            .map(|v| clamp_volume(v as f32))
            .unwrap_or(DEFAULT_GLOBAL_VOLUME);

        Ok(PersistedState {
            sounds,
            global_volume,
        })
    }

    /// Serializes the state as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Storage for persisted state.
pub trait StateStore: Send {
    /// Loads the persisted state. Returns None if nothing has been saved yet.
    fn load(&self) -> Result<Option<PersistedState>, StoreError>;

    /// Saves the state, replacing whatever was there.
    fn save(&self, state: &PersistedState) -> Result<(), StoreError>;
}

/// Stores state as a JSON file on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: &Path) -> JsonFileStore {
        JsonFileStore {
            path: path.to_path_buf(),
        }
    }

    /// The path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        if !self.path.exists() {
            debug!(path = ?self.path, "No state file yet");
            return Ok(None);
        }

        let text = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        Ok(Some(PersistedState::from_json(&text)?))
    }

    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        // Write next to the real file and rename over it so a failed write can't truncate
        // the previous state.
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, state.to_json()?).map_err(|e| self.io_error(e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(e))?;

        debug!(path = ?self.path, sounds = state.sounds.len(), "State saved");
        Ok(())
    }
}

/// An in-memory store. Clones share the same contents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    contents: Arc<Mutex<Option<String>>>,
    fail_saves: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Creates a store that already holds the given raw text.
    pub fn with_contents(contents: &str) -> MemoryStore {
        let store = MemoryStore::new();
        *store.contents.lock() = Some(contents.to_string());
        store
    }

    /// Makes subsequent saves fail, for exercising persistence failures.
    pub fn set_fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }

    /// The raw text last saved, if any.
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        match self.contents.lock().as_deref() {
            Some(text) => Ok(Some(PersistedState::from_json(text)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        if *self.fail_saves.lock() {
            return Err(StoreError::Unavailable("saves are disabled".to_string()));
        }
        *self.contents.lock() = Some(state.to_json()?);
        Ok(())
    }
}
