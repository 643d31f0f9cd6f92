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

use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

/// Icon given to sounds that don't specify one.
pub const DEFAULT_ICON: &str = "🔊";

/// Individual volume given to new sounds.
pub const DEFAULT_VOLUME: f32 = 1.0;

/// The colors a new sound may be painted with when none is given.
pub const PALETTE: [&str; 14] = [
    "#3498db", "#2ecc71", "#e74c3c", "#f39c12", "#9b59b6", "#1abc9c", "#e67e22", "#34495e",
    "#16a085", "#d35400", "#8e44ad", "#27ae60", "#5dade2", "#f1c40f",
];

/// Length of the random part of a generated sound ID.
const ID_SUFFIX_LEN: usize = 7;

/// Clamps a volume into [0, 1]. NaN is treated as silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Picks a color uniformly at random from the palette.
pub fn random_color() -> String {
    PALETTE
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(PALETTE[0])
        .to_string()
}

/// Returns the file name without its extension, which is what sounds are named by default.
pub fn name_from_file(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file)
        .to_string()
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

/// Reads a string that may be null. Null becomes empty and is filled in by `Sound::repair`.
fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_volume<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(DEFAULT_VOLUME))
}

fn nullable_id<'de, D>(deserializer: D) -> Result<SoundId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<SoundId>::deserialize(deserializer)?.unwrap_or_else(SoundId::generate))
}

/// An opaque, unique sound identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundId(String);

impl SoundId {
    /// Generates a new ID from the current time and a random suffix.
    pub fn generate() -> SoundId {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ID_SUFFIX_LEN)
            .map(|c| char::from(c).to_ascii_lowercase())
            .collect();
        SoundId(format!("{}{}", to_base36(millis), suffix))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SoundId {
    fn from(id: &str) -> Self {
        SoundId(id.to_string())
    }
}

impl From<String> for SoundId {
    fn from(id: String) -> Self {
        SoundId(id)
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// A playable clip and its display and binding metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sound {
    /// Unique identifier, never reused.
    #[serde(default = "SoundId::generate", deserialize_with = "nullable_id")]
    pub id: SoundId,
    /// The label shown on the sound's button.
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    /// The asset file name, relative to the sounds directory.
    pub file: String,
    /// Button color as a hex string.
    #[serde(default = "random_color", deserialize_with = "nullable_string")]
    pub color: String,
    /// A short glyph shown on the button.
    #[serde(default = "default_icon", deserialize_with = "nullable_string")]
    pub icon: String,
    /// Per-sound gain in [0, 1].
    #[serde(default = "default_volume", deserialize_with = "nullable_volume")]
    pub volume: f32,
    /// The normalized key bound to this sound, if any.
    #[serde(default)]
    pub shortcut: Option<String>,
}

impl Sound {
    /// Creates a sound for the given file, filling in defaults for anything not supplied.
    /// Empty strings count as not supplied.
    pub fn new(
        id: SoundId,
        file: &str,
        name: Option<&str>,
        icon: Option<&str>,
        color: Option<&str>,
        shortcut: Option<&str>,
    ) -> Sound {
        let non_empty = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_string);
        Sound {
            id,
            name: non_empty(name).unwrap_or_else(|| name_from_file(file)),
            file: file.to_string(),
            color: non_empty(color).unwrap_or_else(random_color),
            icon: non_empty(icon).unwrap_or_else(default_icon),
            volume: DEFAULT_VOLUME,
            shortcut: non_empty(shortcut),
        }
    }

    /// Fills in fields a persisted record may have left blank and clamps the volume.
    pub(crate) fn repair(&mut self) {
        if self.name.is_empty() {
            self.name = name_from_file(&self.file);
        }
        if self.icon.is_empty() {
            self.icon = default_icon();
        }
        if self.color.is_empty() {
            self.color = random_color();
        }
        self.volume = clamp_volume(self.volume);
        if self.shortcut.as_deref().is_some_and(str::is_empty) {
            self.shortcut = None;
        }
    }

    /// Merges the patch into this sound. Fields left as None are untouched.
    pub fn apply(&mut self, patch: SoundPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(file) = patch.file {
            self.file = file;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(icon) = patch.icon {
            self.icon = icon;
        }
        if let Some(volume) = patch.volume {
            self.volume = clamp_volume(volume);
        }
        if let Some(shortcut) = patch.shortcut {
            self.shortcut = shortcut;
        }
    }
}

/// A partial update to a sound.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SoundPatch {
    pub name: Option<String>,
    pub file: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub volume: Option<f32>,
    /// `Some(None)` clears the shortcut.
    pub shortcut: Option<Option<String>>,
}

impl SoundPatch {
    /// A patch that only changes the individual volume.
    pub fn volume(volume: f32) -> SoundPatch {
        SoundPatch {
            volume: Some(volume),
            ..Default::default()
        }
    }

    /// A patch that only sets or clears the shortcut.
    pub fn shortcut(shortcut: Option<String>) -> SoundPatch {
        SoundPatch {
            shortcut: Some(shortcut),
            ..Default::default()
        }
    }

    /// Returns true if this patch would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == SoundPatch::default()
    }
}
