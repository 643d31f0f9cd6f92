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
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, File};
use serde::{Deserialize, Serialize};

mod audio;
mod error;
mod shortcuts;

pub use self::audio::Audio;
pub use self::error::ConfigError;
pub use self::shortcuts::Shortcuts;

const DEFAULT_SOUNDS_DIRECTORY: &str = "sounds";
const DEFAULT_STATE_FILE: &str = "soundboard.json";
const DEFAULT_SIGNAL_POLL_INTERVAL_MS: u64 = 20;

/// A YAML representation of the soundboard settings.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Settings {
    /// The directory holding the audio files.
    sounds_directory: Option<String>,

    /// The file the sound catalog and global volume are saved to.
    state_file: Option<String>,

    /// The audio output configuration.
    audio: Option<Audio>,

    /// Keyboard shortcut behavior.
    shortcuts: Option<Shortcuts>,

    /// How often, in milliseconds, finished sounds are collected while running.
    signal_poll_interval_ms: Option<u64>,

    /// Relative paths are resolved against this. Set to the settings file's directory.
    #[serde(skip)]
    base_path: PathBuf,
}

impl Settings {
    /// Parses settings from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Settings, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Settings>()?;
        settings.base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(settings)
    }

    /// Loads settings from the given file, or uses the defaults relative to the current
    /// directory if there isn't one.
    pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
        match path {
            Some(path) => Settings::deserialize(path),
            None => Ok(Settings::default()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Returns the sounds directory.
    pub fn sounds_directory(&self) -> PathBuf {
        self.resolve(
            self.sounds_directory
                .as_deref()
                .unwrap_or(DEFAULT_SOUNDS_DIRECTORY),
        )
    }

    /// Returns the state file path.
    pub fn state_file(&self) -> PathBuf {
        self.resolve(self.state_file.as_deref().unwrap_or(DEFAULT_STATE_FILE))
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> Audio {
        self.audio.clone().unwrap_or_default()
    }

    /// Returns the shortcut configuration.
    pub fn shortcuts(&self) -> Shortcuts {
        self.shortcuts.clone().unwrap_or_default()
    }

    /// Returns how often playback completion is polled.
    pub fn signal_poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.signal_poll_interval_ms
                .unwrap_or(DEFAULT_SIGNAL_POLL_INTERVAL_MS)
                .max(1),
        )
    }

    /// Serializes the settings, with defaults filled in, to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        let effective = Settings {
            sounds_directory: Some(self.sounds_directory().display().to_string()),
            state_file: Some(self.state_file().display().to_string()),
            audio: Some(self.audio()),
            shortcuts: Some(self.shortcuts()),
            signal_poll_interval_ms: Some(self.signal_poll_interval().as_millis() as u64),
            base_path: self.base_path.clone(),
        };
        Ok(serde_yml::to_string(&effective)?)
    }
}
