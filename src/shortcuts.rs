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

use std::collections::HashMap;

use tracing::{debug, info, span, warn, Level, Span};

use crate::library::SoundLibrary;
use crate::sound::{SoundId, SoundPatch};

/// Keys that are never dispatched on their own.
const MODIFIER_KEYS: [&str; 4] = ["control", "alt", "shift", "meta"];

/// The stop-all key when none is configured.
pub const DEFAULT_STOP_ALL_KEY: &str = "escape";

/// Normalizes a key name for comparison. Idempotent.
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}

/// Where keyboard focus is when a key is pressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusContext {
    /// Focus is on the board itself. Shortcuts apply.
    Board,
    /// Focus is in a text field. Keys belong to the field.
    TextEntry,
}

/// What the binder did with a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyDisposition {
    /// The key triggered an action and shouldn't be handled further.
    Consumed,
    /// The key isn't bound to anything.
    PassThrough,
    /// The binder isn't handling keys right now.
    Ignored,
}

impl KeyDisposition {
    pub fn is_consumed(&self) -> bool {
        *self == KeyDisposition::Consumed
    }
}

/// Binder behavior that isn't part of the key map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinderOptions {
    /// The key that stops every playing sound.
    pub stop_all_key: String,
    /// Whether the stop-all key works while the binder is inactive.
    pub stop_all_bypasses_inactive: bool,
}

impl Default for BinderOptions {
    fn default() -> Self {
        BinderOptions {
            stop_all_key: DEFAULT_STOP_ALL_KEY.to_string(),
            stop_all_bypasses_inactive: false,
        }
    }
}

/// Maps keys to sounds. A key triggers at most one sound and a sound has at most one key.
pub struct ShortcutBinder {
    bindings: HashMap<String, SoundId>,
    active: bool,
    options: BinderOptions,
    span: Span,
}

impl Default for ShortcutBinder {
    fn default() -> Self {
        ShortcutBinder::new(BinderOptions::default())
    }
}

impl ShortcutBinder {
    /// Creates an empty, active binder.
    pub fn new(options: BinderOptions) -> ShortcutBinder {
        ShortcutBinder {
            bindings: HashMap::new(),
            active: true,
            options: BinderOptions {
                stop_all_key: normalize_key(&options.stop_all_key),
                ..options
            },
            span: span!(Level::INFO, "shortcuts"),
        }
    }

    /// Rebuilds the key map from the shortcuts stored on the sounds. If two sounds claim the
    /// same key the later one in the catalog keeps it.
    pub fn initialize(&mut self, library: &SoundLibrary) {
        let _enter = self.span.enter();

        self.bindings.clear();
        for sound in library.sounds() {
            let Some(shortcut) = sound.shortcut.as_deref().filter(|s| !s.is_empty()) else {
                continue;
            };
            let key = normalize_key(shortcut);
            if let Some(previous) = self.bindings.insert(key.clone(), sound.id.clone()) {
                warn!(
                    key,
                    previous = %previous,
                    sound = %sound.id,
                    "Key bound to more than one sound, keeping the last"
                );
            }
        }
        info!(bindings = self.bindings.len(), "Shortcuts loaded");
    }

    /// Handles a key press. Keys are ignored while the binder is inactive (apart from a
    /// bypassing stop-all key), while a text field has focus, and for bare modifiers.
    pub fn handle_key_event(
        &self,
        library: &mut SoundLibrary,
        raw_key: &str,
        focus: FocusContext,
    ) -> KeyDisposition {
        let key = normalize_key(raw_key);
        let is_stop_all = key == self.options.stop_all_key;

        if !self.active && !(is_stop_all && self.options.stop_all_bypasses_inactive) {
            return KeyDisposition::Ignored;
        }
        if focus == FocusContext::TextEntry || MODIFIER_KEYS.contains(&key.as_str()) {
            return KeyDisposition::Ignored;
        }

        if is_stop_all {
            let stopped = library.stop_all_sounds();
            debug!(key, stopped, "Stop-all key pressed");
            return KeyDisposition::Consumed;
        }

        match self.bindings.get(&key) {
            Some(id) => {
                let outcome = library.play_sound(id);
                debug!(key, sound = %id, outcome = ?outcome, "Shortcut triggered");
                KeyDisposition::Consumed
            }
            None => KeyDisposition::PassThrough,
        }
    }

    /// Binds the key to the sound, taking it from any sound that had it and dropping the
    /// sound's previous key. An empty or missing key removes the sound's binding.
    pub fn set_shortcut(
        &mut self,
        library: &mut SoundLibrary,
        sound_id: &SoundId,
        key: Option<&str>,
    ) -> bool {
        let Some(key) = key.filter(|k| !k.is_empty()) else {
            self.remove_shortcut_for_sound(library, sound_id);
            return true;
        };
        let key = normalize_key(key);

        self.remove_shortcut_for_sound(library, sound_id);
        if let Some(holder) = self.bindings.get(&key).cloned() {
            self.remove_shortcut_for_sound(library, &holder);
        }

        self.bindings.insert(key.clone(), sound_id.clone());
        let _enter = self.span.enter();
        if !library.update_sound(sound_id, SoundPatch::shortcut(Some(key.clone()))) {
            warn!(key, sound = %sound_id, "Bound key to a sound that isn't in the library");
        } else {
            info!(key, sound = %sound_id, "Shortcut set");
        }
        true
    }

    /// Removes whatever key the sound is bound to and clears the sound's shortcut.
    pub fn remove_shortcut_for_sound(&mut self, library: &mut SoundLibrary, sound_id: &SoundId) {
        let bound = self
            .bindings
            .iter()
            .find(|(_, id)| *id == sound_id)
            .map(|(key, _)| key.clone());
        if let Some(key) = bound {
            self.bindings.remove(&key);
            let _enter = self.span.enter();
            debug!(key, sound = %sound_id, "Shortcut removed");
        }

        if library
            .sound(sound_id)
            .is_some_and(|sound| sound.shortcut.is_some())
        {
            library.update_sound(sound_id, SoundPatch::shortcut(None));
        }
    }

    /// Returns the sound bound to the key.
    pub fn sound_id_by_shortcut(&self, raw_key: &str) -> Option<SoundId> {
        self.bindings.get(&normalize_key(raw_key)).cloned()
    }

    /// Returns the key bound to the sound.
    pub fn shortcut_for(&self, sound_id: &SoundId) -> Option<String> {
        self.bindings
            .iter()
            .find(|(_, id)| *id == sound_id)
            .map(|(key, _)| key.clone())
    }

    /// Returns every binding, sorted by key.
    pub fn bindings(&self) -> Vec<(String, SoundId)> {
        let mut bindings: Vec<(String, SoundId)> = self
            .bindings
            .iter()
            .map(|(key, id)| (key.clone(), id.clone()))
            .collect();
        bindings.sort();
        bindings
    }

    /// Turns shortcut handling on. Returns the new state.
    pub fn enable(&mut self) -> bool {
        self.active = true;
        self.active
    }

    /// Turns shortcut handling off. Returns the new state.
    pub fn disable(&mut self) -> bool {
        self.active = false;
        self.active
    }

    /// Flips shortcut handling. Returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        let _enter = self.span.enter();
        info!(active = self.active, "Shortcuts toggled");
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Writes the key map back onto the sounds wherever they disagree.
    pub fn sync_to_library(&self, library: &mut SoundLibrary) {
        for sound in library.sounds() {
            let current = self.shortcut_for(&sound.id);
            if sound.shortcut != current {
                library.update_sound(&sound.id, SoundPatch::shortcut(current));
            }
        }
    }
}
