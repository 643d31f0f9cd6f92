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

use crossbeam_channel::Receiver;
use tracing::{error, info};

use crate::assets::{AssetError, AssetStore};
use crate::audio;
use crate::events::SoundEvent;
use crate::library::{PlayOutcome, SoundLibrary};
use crate::shortcuts::{BinderOptions, FocusContext, KeyDisposition, ShortcutBinder};
use crate::sound::{Sound, SoundId, SoundPatch};
use crate::store::{StateStore, StoreError};

/// Owns a library and a binder. Changes to shortcuts made through here go through the binder
/// so the key map and the sounds never disagree.
pub struct Soundboard {
    library: SoundLibrary,
    binder: ShortcutBinder,
}

impl Soundboard {
    /// Creates a soundboard and loads its state.
    pub fn new(
        store: Box<dyn StateStore>,
        assets: Box<dyn AssetStore>,
        backend: Box<dyn audio::Backend>,
        options: BinderOptions,
    ) -> Soundboard {
        let mut library = SoundLibrary::new(store, assets, backend);
        library.initialize();
        let mut binder = ShortcutBinder::new(options);
        binder.initialize(&library);

        Soundboard { library, binder }
    }

    /// Adds a sound and binds its shortcut, taking the key from any sound that had it.
    pub fn add_sound(
        &mut self,
        file: &str,
        name: Option<&str>,
        icon: Option<&str>,
        color: Option<&str>,
        shortcut: Option<&str>,
    ) -> SoundId {
        let id = self.library.add_sound(file, name, icon, color, None);
        if shortcut.is_some_and(|s| !s.is_empty()) {
            self.binder.set_shortcut(&mut self.library, &id, shortcut);
            self.save_logged();
        }
        id
    }

    /// Copies a file into the sounds directory and adds a sound for it.
    pub fn import_sound(
        &mut self,
        source: &Path,
        name: Option<&str>,
    ) -> Result<SoundId, AssetError> {
        self.library.import_sound(source, name)
    }

    /// Removes a sound along with its shortcut.
    pub fn remove_sound(&mut self, id: &SoundId) -> bool {
        self.binder.remove_shortcut_for_sound(&mut self.library, id);
        self.library.remove_sound(id)
    }

    /// Updates a sound. A shortcut in the patch is routed through the binder.
    pub fn update_sound(&mut self, id: &SoundId, mut patch: SoundPatch) -> bool {
        if self.library.sound(id).is_none() {
            return false;
        }

        if let Some(shortcut) = patch.shortcut.take() {
            self.binder
                .set_shortcut(&mut self.library, id, shortcut.as_deref());
        }
        if patch.is_empty() {
            return true;
        }
        self.library.update_sound(id, patch)
    }

    /// Binds a key to a sound, or unbinds the sound's key when the key is None.
    pub fn set_shortcut(&mut self, id: &SoundId, key: Option<&str>) -> bool {
        self.binder.set_shortcut(&mut self.library, id, key)
    }

    pub fn play_sound(&mut self, id: &SoundId) -> PlayOutcome {
        self.library.play_sound(id)
    }

    pub fn stop_sound(&mut self, id: &SoundId) -> bool {
        self.library.stop_sound(id)
    }

    pub fn stop_all_sounds(&mut self) -> usize {
        self.library.stop_all_sounds()
    }

    pub fn set_global_volume(&mut self, volume: f32) -> f32 {
        self.library.set_global_volume(volume)
    }

    /// Dispatches a key press to the binder.
    pub fn handle_key_event(&mut self, key: &str, focus: FocusContext) -> KeyDisposition {
        self.binder.handle_key_event(&mut self.library, key, focus)
    }

    /// Flips shortcut handling on or off. Returns the new state.
    pub fn toggle_shortcuts(&mut self) -> bool {
        self.binder.toggle()
    }

    pub fn set_shortcuts_enabled(&mut self, enabled: bool) -> bool {
        if enabled {
            self.binder.enable()
        } else {
            self.binder.disable()
        }
    }

    /// Collects completion reports from playing sounds.
    pub fn process_playback_signals(&mut self) -> usize {
        self.library.process_playback_signals()
    }

    pub fn subscribe(&mut self) -> Receiver<SoundEvent> {
        self.library.subscribe()
    }

    /// Writes the key map back onto the sounds and saves.
    pub fn save(&mut self) -> Result<(), StoreError> {
        self.binder.sync_to_library(&mut self.library);
        self.library.save_config()
    }

    fn save_logged(&mut self) {
        match self.save() {
            Ok(()) => info!("Soundboard saved"),
            Err(e) => error!(err = %e, "Error saving soundboard"),
        }
    }

    pub fn sounds(&self) -> Vec<Sound> {
        self.library.sounds()
    }

    pub fn sound(&self, id: &SoundId) -> Option<Sound> {
        self.library.sound(id)
    }

    /// Finds a sound by ID, or failing that by exact name.
    pub fn find(&self, id_or_name: &str) -> Option<Sound> {
        self.library
            .sound(&SoundId::from(id_or_name))
            .or_else(|| {
                self.library
                    .sounds()
                    .into_iter()
                    .find(|sound| sound.name == id_or_name)
            })
    }

    pub fn global_volume(&self) -> f32 {
        self.library.global_volume()
    }

    pub fn playing(&self) -> Vec<SoundId> {
        self.library.playing()
    }

    pub fn is_playing(&self, id: &SoundId) -> bool {
        self.library.is_playing(id)
    }

    pub fn shortcuts_active(&self) -> bool {
        self.binder.is_active()
    }

    pub fn binder(&self) -> &ShortcutBinder {
        &self.binder
    }
}

impl fmt::Display for Soundboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Soundboard ({} sounds, volume {}, shortcuts {}):",
            self.library.sounds().len(),
            crate::util::volume_percent(self.library.global_volume()),
            if self.binder.is_active() { "on" } else { "off" },
        )?;
        for sound in self.library.sounds() {
            write!(
                f,
                "  {} {} [{}] {} ({})",
                sound.icon,
                sound.name,
                sound.id,
                sound.file,
                crate::util::volume_percent(sound.volume),
            )?;
            if let Some(shortcut) = &sound.shortcut {
                write!(f, " key={}", shortcut)?;
            }
            if self.library.is_playing(&sound.id) {
                write!(f, " playing")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::audio::mock;
    use crate::store::MemoryStore;
    use crate::testutil::FixedAssets;

    use super::*;

    fn soundboard(files: &[&str]) -> (Soundboard, mock::Backend, MemoryStore) {
        let store = MemoryStore::new();
        let backend = mock::Backend::new("mock-device");
        let soundboard = Soundboard::new(
            Box::new(store.clone()),
            Box::new(FixedAssets::new(files)),
            Box::new(backend.clone()),
            BinderOptions::default(),
        );
        (soundboard, backend, store)
    }

    #[test]
    fn test_add_with_shortcut_steals_key() {
        let (mut soundboard, _, store) = soundboard(&[]);
        let first = soundboard.add_sound("a.mp3", None, None, None, Some("K"));
        let second = soundboard.add_sound("b.mp3", None, None, None, Some("k"));

        assert_eq!(None, soundboard.sound(&first).unwrap().shortcut);
        assert_eq!(
            Some("k".to_string()),
            soundboard.sound(&second).unwrap().shortcut
        );
        assert_eq!(
            Some(second.clone()),
            soundboard.binder().sound_id_by_shortcut("k")
        );

        let saved = store.contents().unwrap();
        assert!(saved.contains("\"shortcut\": \"k\""));
    }

    #[test]
    fn test_remove_clears_binding() {
        let (mut soundboard, backend, _) = soundboard(&[]);
        let id = soundboard.add_sound("a.mp3", None, None, None, Some("k"));
        soundboard.play_sound(&id);

        assert!(soundboard.remove_sound(&id));
        assert_eq!(None, soundboard.binder().sound_id_by_shortcut("k"));
        assert!(!backend.is_live(&id));
        assert_eq!(
            KeyDisposition::PassThrough,
            soundboard.handle_key_event("k", FocusContext::Board)
        );
    }

    #[test]
    fn test_update_routes_shortcut() {
        let (mut soundboard, _, _) = soundboard(&["a.mp3", "b.mp3"]);
        let ids: Vec<SoundId> = soundboard.sounds().into_iter().map(|s| s.id).collect();
        soundboard.set_shortcut(&ids[0], Some("q"));

        let patch = SoundPatch {
            name: Some("Second".to_string()),
            shortcut: Some(Some("Q".to_string())),
            ..Default::default()
        };
        assert!(soundboard.update_sound(&ids[1], patch));
        assert_eq!("Second", soundboard.sound(&ids[1]).unwrap().name);
        assert_eq!(None, soundboard.sound(&ids[0]).unwrap().shortcut);
        assert_eq!(
            Some(ids[1].clone()),
            soundboard.binder().sound_id_by_shortcut("q")
        );

        assert!(soundboard.update_sound(&ids[1], SoundPatch::shortcut(None)));
        assert!(soundboard.binder().bindings().is_empty());

        assert!(!soundboard.update_sound(&SoundId::from("nope"), SoundPatch::shortcut(None)));
    }

    #[test]
    fn test_keys_drive_playback() {
        let (mut soundboard, backend, _) = soundboard(&["a.mp3"]);
        let id = soundboard.sounds()[0].id.clone();
        soundboard.set_shortcut(&id, Some("a"));

        assert!(soundboard
            .handle_key_event("A", FocusContext::Board)
            .is_consumed());
        assert!(backend.is_live(&id));
        assert!(soundboard
            .handle_key_event("Escape", FocusContext::Board)
            .is_consumed());
        assert!(soundboard.playing().is_empty());

        assert!(!soundboard.toggle_shortcuts());
        assert_eq!(
            KeyDisposition::Ignored,
            soundboard.handle_key_event("a", FocusContext::Board)
        );
    }

    #[test]
    fn test_save_syncs_shortcuts() {
        let (mut soundboard, _, store) = soundboard(&["a.mp3"]);
        let id = soundboard.sounds()[0].id.clone();
        soundboard.set_shortcut(&id, Some("z"));
        soundboard.save().unwrap();

        let reloaded = Soundboard::new(
            Box::new(store),
            Box::new(FixedAssets::new(&[])),
            Box::new(mock::Backend::new("mock-device")),
            BinderOptions::default(),
        );
        assert_eq!(Some(id), reloaded.binder().sound_id_by_shortcut("z"));
    }

    #[test]
    fn test_find() {
        let (soundboard, _, _) = soundboard(&["bell.wav"]);
        let id = soundboard.sounds()[0].id.clone();
        assert_eq!(Some(id.clone()), soundboard.find("bell").map(|s| s.id));
        assert_eq!(Some(id.clone()), soundboard.find(id.as_str()).map(|s| s.id));
        assert!(soundboard.find("nothing").is_none());
    }

    #[test]
    fn test_natural_end_through_soundboard() {
        let (mut soundboard, backend, _) = soundboard(&["a.mp3"]);
        let events = soundboard.subscribe();
        let id = soundboard.sounds()[0].id.clone();

        assert_eq!(PlayOutcome::Started, soundboard.play_sound(&id));
        backend.finish(&id);
        assert_eq!(1, soundboard.process_playback_signals());
        assert!(!soundboard.is_playing(&id));
        assert_eq!(
            vec![
                SoundEvent::Started { id: id.clone() },
                SoundEvent::Ended { id }
            ],
            events.try_iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_display() {
        let (mut soundboard, _, _) = soundboard(&["bell.wav"]);
        let id = soundboard.sounds()[0].id.clone();
        soundboard.set_shortcut(&id, Some("b"));
        soundboard.set_global_volume(0.5);
        let output = soundboard.to_string();
        assert!(output.contains("1 sounds, volume 50%, shortcuts on"));
        assert!(output.contains("bell"));
        assert!(output.contains("key=b"));
    }
}
