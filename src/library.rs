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

//! The sound catalog and the set of sounds currently playing.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use crossbeam_channel::Receiver;
use tracing::{debug, error, info, span, warn, Level, Span};

use crate::assets::{AssetError, AssetStore};
use crate::audio::{self, PlaybackId, PlaybackSignal, SignalKind, SignalSender};
use crate::events::{Notifier, SoundEvent};
use crate::sound::{clamp_volume, Sound, SoundId, SoundPatch};
use crate::store::{PersistedState, StateStore, StoreError, DEFAULT_GLOBAL_VOLUME};

/// What a call to play_sound did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The sound wasn't playing and now is.
    Started,
    /// The sound was playing and has been stopped.
    Stopped,
    /// The sound couldn't be loaded or started. An error event was emitted.
    Failed,
    /// There's no sound with that ID.
    NotFound,
}

/// A sound that is currently playing.
struct ActivePlayback {
    playback: PlaybackId,
    handle: Box<dyn audio::Handle>,
}

/// Owns the sound catalog, the playing instances and the global volume.
pub struct SoundLibrary {
    /// Where the catalog is persisted.
    store: Box<dyn StateStore>,
    /// Where the audio files live.
    assets: Box<dyn AssetStore>,
    /// Turns files into playable handles.
    backend: Box<dyn audio::Backend>,
    /// The catalog, in insertion order.
    sounds: Vec<Sound>,
    /// At most one playing instance per sound.
    active: HashMap<SoundId, ActivePlayback>,
    global_volume: f32,
    initialized: bool,
    notifier: Notifier,
    /// Handles report completion here; drained by process_playback_signals.
    signals_tx: SignalSender,
    signals_rx: Receiver<PlaybackSignal>,
    /// The logging span.
    span: Span,
}

impl SoundLibrary {
    /// Creates an empty, uninitialized library.
    pub fn new(
        store: Box<dyn StateStore>,
        assets: Box<dyn AssetStore>,
        backend: Box<dyn audio::Backend>,
    ) -> SoundLibrary {
        let (signals_tx, signals_rx) = crossbeam_channel::unbounded();
        SoundLibrary {
            store,
            assets,
            backend,
            sounds: Vec::new(),
            active: HashMap::new(),
            global_volume: DEFAULT_GLOBAL_VOLUME,
            initialized: false,
            notifier: Notifier::new(),
            signals_tx,
            signals_rx,
            span: span!(Level::INFO, "sound library"),
        }
    }

    /// Loads the persisted catalog, or bootstraps one from the asset listing if it's empty.
    /// Load failures fall back to an empty catalog. Only the first call does anything.
    pub fn initialize(&mut self) {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.initialized {
            debug!("Library already initialized");
            return;
        }

        let state = match self.store.load() {
            Ok(Some(state)) => state,
            Ok(None) => {
                info!("No saved state, starting fresh");
                PersistedState::default()
            }
            Err(e) => {
                warn!(err = %e, "Unable to load saved state, starting fresh");
                PersistedState::default()
            }
        };

        let mut seen = HashSet::new();
        self.sounds = state
            .sounds
            .into_iter()
            .filter(|sound| {
                let fresh = seen.insert(sound.id.clone());
                if !fresh {
                    warn!(sound = %sound.id, "Dropping sound with duplicate ID");
                }
                fresh
            })
            .collect();
        self.global_volume = clamp_volume(state.global_volume);

        if self.sounds.is_empty() {
            self.bootstrap();
        }

        self.initialized = true;
        info!(
            sounds = self.sounds.len(),
            global_volume = self.global_volume,
            "Library initialized"
        );
    }

    /// Creates one sound per file in the asset store.
    fn bootstrap(&mut self) {
        let files = match self.assets.list() {
            Ok(files) => files,
            Err(e) => {
                warn!(err = %e, "Unable to list sound files");
                self.sounds = Vec::new();
                return;
            }
        };

        for file in files {
            let id = self.generate_id();
            debug!(sound = %id, file = %file, "Adding sound from directory");
            self.sounds
                .push(Sound::new(id, &file, None, None, None, None));
        }
    }

    /// Generates an ID that isn't in the catalog.
    fn generate_id(&self) -> SoundId {
        loop {
            let id = SoundId::generate();
            if self.position(&id).is_none() {
                return id;
            }
        }
    }

    fn position(&self, id: &SoundId) -> Option<usize> {
        self.sounds.iter().position(|sound| &sound.id == id)
    }

    fn effective_volume(&self, sound: &Sound) -> f32 {
        clamp_volume(self.global_volume * sound.volume)
    }

    /// Adds a sound to the catalog and saves. The file isn't checked for existence. Empty
    /// strings count as not given.
    pub fn add_sound(
        &mut self,
        file: &str,
        name: Option<&str>,
        icon: Option<&str>,
        color: Option<&str>,
        shortcut: Option<&str>,
    ) -> SoundId {
        let id = self.generate_id();
        let sound = Sound::new(id.clone(), file, name, icon, color, shortcut);
        {
            let _enter = self.span.enter();
            info!(sound = %id, name = %sound.name, file, "Adding sound");
        }
        self.sounds.push(sound);

        if let Err(e) = self.save_config() {
            error!(err = %e, "Error saving after adding sound");
        }
        id
    }

    /// Removes a sound, stopping it first if it's playing.
    pub fn remove_sound(&mut self, id: &SoundId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };

        // Stop before the record goes away so nothing is left playing for a missing sound.
        self.stop_sound(id);
        let sound = self.sounds.remove(index);

        let _enter = self.span.enter();
        info!(sound = %id, name = %sound.name, "Removed sound");
        true
    }

    /// Merges the patch into the sound. A volume change is applied to the playing instance
    /// right away.
    pub fn update_sound(&mut self, id: &SoundId, patch: SoundPatch) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };

        let volume_changed = patch.volume.is_some();
        self.sounds[index].apply(patch);

        if volume_changed {
            let effective = self.effective_volume(&self.sounds[index]);
            if let Some(active) = self.active.get_mut(id) {
                active.handle.set_volume(effective);
            }
        }
        true
    }

    /// Toggles playback: stops the sound if it's playing, otherwise starts it.
    pub fn play_sound(&mut self, id: &SoundId) -> PlayOutcome {
        // An instance that already ended must not be toggled off.
        self.process_playback_signals();

        let Some(index) = self.position(id) else {
            let _enter = self.span.enter();
            warn!(sound = %id, "Cannot play unknown sound");
            return PlayOutcome::NotFound;
        };

        if self.active.contains_key(id) {
            self.stop_sound(id);
            return PlayOutcome::Stopped;
        }

        let sound = &self.sounds[index];
        let path = self.assets.resolve(&sound.file);
        let volume = self.effective_volume(sound);
        let name = sound.name.clone();

        let _enter = self.span.enter();
        let started = self
            .backend
            .load(&path, id, self.signals_tx.clone())
            .and_then(|mut handle| {
                handle.set_volume(volume);
                handle.start()?;
                Ok(handle)
            });

        match started {
            Ok(handle) => {
                info!(sound = %id, name = %name, volume, "Playing sound");
                self.active.insert(
                    id.clone(),
                    ActivePlayback {
                        playback: handle.playback_id(),
                        handle,
                    },
                );
                self.notifier.emit(SoundEvent::Started { id: id.clone() });
                PlayOutcome::Started
            }
            Err(e) => {
                error!(sound = %id, name = %name, path = ?path, err = %e, "Unable to play sound");
                self.notifier.emit(SoundEvent::Error {
                    id: id.clone(),
                    message: e.to_string(),
                });
                PlayOutcome::Failed
            }
        }
    }

    /// Stops the sound if it's playing.
    pub fn stop_sound(&mut self, id: &SoundId) -> bool {
        self.process_playback_signals();

        let Some(mut active) = self.active.remove(id) else {
            return false;
        };

        active.handle.stop();
        debug!(sound = %id, playback = active.playback, "Stopped sound");
        self.notifier.emit(SoundEvent::Ended { id: id.clone() });
        true
    }

    /// Stops every playing sound and returns how many there were.
    pub fn stop_all_sounds(&mut self) -> usize {
        self.process_playback_signals();
        let _enter = self.span.enter();

        let stopped: Vec<(SoundId, ActivePlayback)> = self.active.drain().collect();
        let count = stopped.len();
        for (id, mut active) in stopped {
            active.handle.stop();
            self.notifier.emit(SoundEvent::Ended { id });
        }

        if count > 0 {
            info!(count, "Stopped all sounds");
        }
        count
    }

    /// Sets the global volume, applying it to everything playing. Returns the clamped value.
    pub fn set_global_volume(&mut self, volume: f32) -> f32 {
        self.global_volume = clamp_volume(volume);

        for sound in &self.sounds {
            if let Some(active) = self.active.get_mut(&sound.id) {
                active
                    .handle
                    .set_volume(clamp_volume(self.global_volume * sound.volume));
            }
        }

        let _enter = self.span.enter();
        info!(volume = self.global_volume, "Global volume changed");
        self.notifier.emit(SoundEvent::VolumeChanged {
            volume: self.global_volume,
        });
        self.global_volume
    }

    /// Returns a copy of the catalog.
    pub fn sounds(&self) -> Vec<Sound> {
        self.sounds.clone()
    }

    /// Returns a copy of the sound with the given ID.
    pub fn sound(&self, id: &SoundId) -> Option<Sound> {
        self.sounds.iter().find(|sound| &sound.id == id).cloned()
    }

    pub fn global_volume(&self) -> f32 {
        self.global_volume
    }

    /// Returns true if the sound is playing.
    pub fn is_playing(&self, id: &SoundId) -> bool {
        self.active.contains_key(id)
    }

    /// Returns the IDs of the playing sounds in catalog order.
    pub fn playing(&self) -> Vec<SoundId> {
        self.sounds
            .iter()
            .filter(|sound| self.active.contains_key(&sound.id))
            .map(|sound| sound.id.clone())
            .collect()
    }

    /// Persists the catalog and the global volume.
    pub fn save_config(&self) -> Result<(), StoreError> {
        let state = PersistedState {
            sounds: self.sounds.clone(),
            global_volume: self.global_volume,
        };
        self.store.save(&state)
    }

    /// Handles completion and failure reports from playing instances. Reports for instances
    /// that have already been stopped or replaced are ignored. Returns how many reports
    /// changed anything.
    pub fn process_playback_signals(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(signal) = self.signals_rx.try_recv() {
            let current = self
                .active
                .get(&signal.sound)
                .is_some_and(|active| active.playback == signal.playback);
            if !current {
                debug!(
                    sound = %signal.sound,
                    playback = signal.playback,
                    "Ignoring stale playback signal"
                );
                continue;
            }

            self.active.remove(&signal.sound);
            handled += 1;
            let event = match signal.kind {
                SignalKind::Finished => {
                    debug!(sound = %signal.sound, "Sound finished");
                    SoundEvent::Ended { id: signal.sound }
                }
                SignalKind::Failed(message) => {
                    error!(sound = %signal.sound, err = %message, "Playback failed");
                    SoundEvent::Error {
                        id: signal.sound,
                        message,
                    }
                }
            };
            self.notifier.emit(event);
        }
        handled
    }

    /// Registers an observer for library events.
    pub fn subscribe(&mut self) -> Receiver<SoundEvent> {
        self.notifier.subscribe()
    }

    /// Imports a file into the asset store and adds a sound for it.
    pub fn import_sound(
        &mut self,
        source: &Path,
        name: Option<&str>,
    ) -> Result<SoundId, AssetError> {
        let file = self.assets.import(source)?;
        Ok(self.add_sound(&file, name, None, None, None))
    }
}

impl fmt::Debug for SoundLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundLibrary")
            .field("sounds", &self.sounds.len())
            .field("playing", &self.active.len())
            .field("global_volume", &self.global_volume)
            .field("backend", &self.backend.to_string())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use crate::store::{MemoryStore, StateStore};
    use crate::testutil::{mock_library, FixedAssets};

    use super::*;

    fn library_with(files: &[&str]) -> (SoundLibrary, audio::mock::Backend, MemoryStore) {
        let (mut library, backend, store) = mock_library(MemoryStore::new(), files);
        library.initialize();
        (library, backend, store)
    }

    fn drain(events: &Receiver<SoundEvent>) -> Vec<SoundEvent> {
        events.try_iter().collect()
    }

    #[test]
    fn test_bootstrap_from_directory() {
        let (library, _, store) = library_with(&["a.mp3", "b.wav"]);

        let sounds = library.sounds();
        assert_eq!(2, sounds.len());
        assert_eq!("a", sounds[0].name);
        assert_eq!("a.mp3", sounds[0].file);
        assert_eq!("b", sounds[1].name);
        assert_ne!(sounds[0].id, sounds[1].id);
        assert_eq!(1.0, sounds[0].volume);
        assert_eq!(crate::sound::DEFAULT_ICON, sounds[0].icon);
        assert_eq!(None, sounds[0].shortcut);
        assert_eq!(1.0, library.global_volume());

        // Bootstrapping doesn't save.
        assert_eq!(None, store.contents());
    }

    #[test]
    fn test_initialize_from_store() {
        let store = MemoryStore::with_contents(
            r##"{"sounds":[{"id":"x1","name":"Horn","file":"horn.ogg","color":"#fff","icon":"📯","volume":0.5,"shortcut":"h"}],"globalVolume":3.0}"##,
        );
        let (mut library, _, _) = mock_library(store, &["ignored.mp3"]);
        library.initialize();

        let sounds = library.sounds();
        assert_eq!(1, sounds.len());
        assert_eq!("Horn", sounds[0].name);
        assert_eq!(Some("h".to_string()), sounds[0].shortcut);
        assert_eq!(1.0, library.global_volume());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (mut library, _, _) = library_with(&["a.mp3"]);
        let id = library.add_sound("b.mp3", None, None, None, None);
        library.set_global_volume(0.3);

        library.initialize();
        assert_eq!(2, library.sounds().len());
        assert!(library.sound(&id).is_some());
        assert_eq!(0.3, library.global_volume());
    }

    #[test]
    fn test_initialize_with_corrupt_state() {
        let store = MemoryStore::with_contents("{ not json");
        let (mut library, _, _) = mock_library(store, &["a.mp3"]);
        library.initialize();
        assert_eq!(1, library.sounds().len());
        assert_eq!(1.0, library.global_volume());
    }

    #[test]
    fn test_initialize_listing_fails() {
        let assets = FixedAssets::new(&["a.mp3"]);
        assets.set_fail_list(true);
        let mut library = SoundLibrary::new(
            Box::new(MemoryStore::new()),
            Box::new(assets),
            Box::new(audio::mock::Backend::new("mock-device")),
        );
        library.initialize();
        assert!(library.sounds().is_empty());
    }

    #[test]
    fn test_initialize_drops_duplicate_ids() {
        let store = MemoryStore::with_contents(
            r#"{"sounds":[{"id":"dup","file":"a.mp3"},{"id":"dup","file":"b.mp3"}],"globalVolume":1}"#,
        );
        let (mut library, _, _) = mock_library(store, &[]);
        library.initialize();
        let sounds = library.sounds();
        assert_eq!(1, sounds.len());
        assert_eq!("a.mp3", sounds[0].file);
    }

    #[test]
    fn test_add_sound_saves() {
        let (mut library, _, store) = library_with(&[]);
        let id = library.add_sound("tap.mp3", Some(""), Some("🥁"), None, Some("t"));

        let sound = library.sound(&id).unwrap();
        assert_eq!("tap", sound.name);
        assert_eq!("🥁", sound.icon);
        assert_eq!(Some("t".to_string()), sound.shortcut);

        let saved = store.load().unwrap().unwrap();
        assert_eq!(vec![sound], saved.sounds);
    }

    #[test]
    fn test_add_sound_save_failure_still_adds() {
        let (mut library, _, store) = library_with(&[]);
        store.set_fail_saves(true);
        let id = library.add_sound("tap.mp3", None, None, None, None);
        assert!(library.sound(&id).is_some());
        assert!(library.save_config().is_err());
    }

    #[test]
    fn test_add_sound_ids_are_unique() {
        let (mut library, _, _) = library_with(&[]);
        let ids: HashSet<SoundId> = (0..50)
            .map(|_| library.add_sound("tap.mp3", None, None, None, None))
            .collect();
        assert_eq!(50, ids.len());
    }

    #[test]
    fn test_play_toggles() {
        let (mut library, backend, _) = library_with(&["a.mp3"]);
        let events = library.subscribe();
        let id = library.sounds()[0].id.clone();

        assert_eq!(PlayOutcome::Started, library.play_sound(&id));
        assert!(library.is_playing(&id));
        assert!(backend.is_live(&id));
        assert_eq!(Some(std::path::PathBuf::from("/fixed/a.mp3")), backend.last_path(&id));

        assert_eq!(PlayOutcome::Stopped, library.play_sound(&id));
        assert!(!library.is_playing(&id));
        assert!(!backend.is_live(&id));

        assert_eq!(
            vec![
                SoundEvent::Started { id: id.clone() },
                SoundEvent::Ended { id: id.clone() }
            ],
            drain(&events)
        );
    }

    #[test]
    fn test_play_unknown() {
        let (mut library, backend, _) = library_with(&[]);
        let events = library.subscribe();
        assert_eq!(
            PlayOutcome::NotFound,
            library.play_sound(&SoundId::from("nope"))
        );
        assert_eq!(0, backend.load_count());
        assert!(drain(&events).is_empty());
    }

    #[test]
    fn test_play_load_failure() {
        let (mut library, backend, _) = library_with(&["a.mp3"]);
        let events = library.subscribe();
        let id = library.sounds()[0].id.clone();

        backend.fail_loads(Some("bad file"));
        assert_eq!(PlayOutcome::Failed, library.play_sound(&id));
        assert!(!library.is_playing(&id));

        let events = drain(&events);
        assert_eq!(1, events.len());
        assert!(matches!(&events[0], SoundEvent::Error { id: error_id, message }
            if error_id == &id && message.contains("bad file")));

        backend.fail_loads(None);
        assert_eq!(PlayOutcome::Started, library.play_sound(&id));
    }

    #[test]
    fn test_play_start_failure() {
        let (mut library, backend, _) = library_with(&["a.mp3"]);
        let id = library.sounds()[0].id.clone();

        backend.fail_starts(Some("device gone"));
        assert_eq!(PlayOutcome::Failed, library.play_sound(&id));
        assert!(library.playing().is_empty());
        assert_eq!(0, backend.live_count());
    }

    #[test]
    fn test_effective_volume() {
        let (mut library, backend, _) = library_with(&["a.mp3"]);
        let id = library.sounds()[0].id.clone();

        library.set_global_volume(0.5);
        library.update_sound(&id, SoundPatch::volume(0.8));
        library.play_sound(&id);
        assert!((backend.applied_volume(&id).unwrap() - 0.4).abs() < 1e-6);

        library.set_global_volume(0.25);
        assert!((backend.applied_volume(&id).unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_update_volume_while_playing() {
        let (mut library, backend, _) = library_with(&["a.mp3"]);
        let id = library.sounds()[0].id.clone();

        library.set_global_volume(0.5);
        library.play_sound(&id);
        assert!(library.update_sound(&id, SoundPatch::volume(0.6)));
        assert!((backend.applied_volume(&id).unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_update_while_idle() {
        let (mut library, backend, _) = library_with(&["a.mp3"]);
        let id = library.sounds()[0].id.clone();

        assert!(library.update_sound(&id, SoundPatch::volume(0.6)));
        assert_eq!(0, backend.load_count());
        assert!(!library.is_playing(&id));
        assert_eq!(0.6, library.sound(&id).unwrap().volume);
    }

    #[test]
    fn test_update_clamps_and_merges() {
        let (mut library, _, _) = library_with(&["a.mp3"]);
        let id = library.sounds()[0].id.clone();

        let patch = SoundPatch {
            name: Some("Alarm".to_string()),
            volume: Some(4.0),
            ..Default::default()
        };
        assert!(library.update_sound(&id, patch));
        let sound = library.sound(&id).unwrap();
        assert_eq!("Alarm", sound.name);
        assert_eq!("a.mp3", sound.file);
        assert_eq!(1.0, sound.volume);

        assert!(!library.update_sound(&SoundId::from("nope"), SoundPatch::volume(0.1)));
    }

    #[test]
    fn test_remove_while_playing() {
        let (mut library, backend, _) = library_with(&["a.mp3", "b.mp3"]);
        let events = library.subscribe();
        let id = library.sounds()[0].id.clone();

        library.play_sound(&id);
        assert!(library.remove_sound(&id));
        assert!(library.sound(&id).is_none());
        assert!(!library.is_playing(&id));
        assert!(!backend.is_live(&id));
        assert_eq!(1, library.sounds().len());
        assert_eq!(
            vec![
                SoundEvent::Started { id: id.clone() },
                SoundEvent::Ended { id: id.clone() }
            ],
            drain(&events)
        );

        assert!(!library.remove_sound(&id));
    }

    #[test]
    fn test_stop_sound() {
        let (mut library, _, _) = library_with(&["a.mp3"]);
        let id = library.sounds()[0].id.clone();

        assert!(!library.stop_sound(&id));
        library.play_sound(&id);
        assert!(library.stop_sound(&id));
        assert!(!library.stop_sound(&id));
    }

    #[test]
    fn test_stop_all() {
        let (mut library, backend, _) = library_with(&["a.mp3", "b.mp3", "c.mp3"]);
        let ids: Vec<SoundId> = library.sounds().into_iter().map(|s| s.id).collect();
        library.play_sound(&ids[0]);
        library.play_sound(&ids[2]);
        let events = library.subscribe();

        assert_eq!(2, library.stop_all_sounds());
        assert!(library.playing().is_empty());
        assert_eq!(0, backend.live_count());

        let ended: HashSet<SoundId> = drain(&events)
            .into_iter()
            .filter_map(|event| match event {
                SoundEvent::Ended { id } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(HashSet::from([ids[0].clone(), ids[2].clone()]), ended);

        assert_eq!(0, library.stop_all_sounds());
    }

    #[test]
    fn test_set_global_volume_clamps() {
        let (mut library, _, _) = library_with(&[]);
        let events = library.subscribe();

        assert_eq!(1.0, library.set_global_volume(1.7));
        assert_eq!(0.0, library.set_global_volume(-0.2));
        assert_eq!(0.0, library.set_global_volume(f32::NAN));
        assert_eq!(0.5, library.set_global_volume(0.5));
        assert_eq!(0.5, library.global_volume());

        assert_eq!(
            vec![
                SoundEvent::VolumeChanged { volume: 1.0 },
                SoundEvent::VolumeChanged { volume: 0.0 },
                SoundEvent::VolumeChanged { volume: 0.0 },
                SoundEvent::VolumeChanged { volume: 0.5 },
            ],
            drain(&events)
        );
    }

    #[test]
    fn test_natural_end() {
        let (mut library, backend, _) = library_with(&["a.mp3"]);
        let id = library.sounds()[0].id.clone();
        library.play_sound(&id);
        let events = library.subscribe();

        assert!(backend.finish(&id));
        assert_eq!(1, library.process_playback_signals());
        assert!(!library.is_playing(&id));
        assert_eq!(vec![SoundEvent::Ended { id: id.clone() }], drain(&events));
    }

    #[test]
    fn test_stop_racing_natural_end() {
        let (mut library, backend, _) = library_with(&["a.mp3"]);
        let id = library.sounds()[0].id.clone();
        library.play_sound(&id);
        let events = library.subscribe();

        library.stop_sound(&id);
        backend.finish(&id);
        assert_eq!(0, library.process_playback_signals());
        assert_eq!(vec![SoundEvent::Ended { id: id.clone() }], drain(&events));
    }

    #[test]
    fn test_stale_signal_after_restart() {
        let (mut library, backend, _) = library_with(&["a.mp3"]);
        let id = library.sounds()[0].id.clone();

        library.play_sound(&id);
        library.stop_sound(&id);
        // The stopped instance reports its end after a new one has been requested.
        backend.finish(&id);
        assert_eq!(PlayOutcome::Started, library.play_sound(&id));

        assert_eq!(0, library.process_playback_signals());
        assert!(library.is_playing(&id));
    }

    #[test]
    fn test_play_after_natural_end() {
        let (mut library, backend, _) = library_with(&["a.mp3"]);
        let id = library.sounds()[0].id.clone();
        let events = library.subscribe();

        library.play_sound(&id);
        backend.finish(&id);
        assert_eq!(PlayOutcome::Started, library.play_sound(&id));
        assert!(library.is_playing(&id));
        assert_eq!(
            vec![
                SoundEvent::Started { id: id.clone() },
                SoundEvent::Ended { id: id.clone() },
                SoundEvent::Started { id: id.clone() },
            ],
            drain(&events)
        );
    }

    #[test]
    fn test_stop_after_natural_end() {
        let (mut library, backend, _) = library_with(&["a.mp3", "b.mp3"]);
        let a = library.sounds()[0].id.clone();
        let b = library.sounds()[1].id.clone();
        library.play_sound(&a);
        library.play_sound(&b);
        let events = library.subscribe();

        backend.finish(&a);
        assert!(!library.stop_sound(&a));
        backend.finish(&b);
        assert_eq!(0, library.stop_all_sounds());
        assert_eq!(
            vec![
                SoundEvent::Ended { id: a.clone() },
                SoundEvent::Ended { id: b.clone() },
            ],
            drain(&events)
        );
    }

    #[test]
    fn test_async_failure() {
        let (mut library, backend, _) = library_with(&["a.mp3"]);
        let id = library.sounds()[0].id.clone();
        library.play_sound(&id);
        let events = library.subscribe();

        backend.fail(&id, "underrun");
        assert_eq!(1, library.process_playback_signals());
        assert!(!library.is_playing(&id));
        assert_eq!(
            vec![SoundEvent::Error {
                id: id.clone(),
                message: "underrun".to_string()
            }],
            drain(&events)
        );
    }

    #[test]
    fn test_save_load_round_trip() {
        let (mut library, _, store) = library_with(&["a.mp3", "b.mp3"]);
        let ids: Vec<SoundId> = library.sounds().into_iter().map(|s| s.id).collect();
        library.update_sound(&ids[1], SoundPatch::volume(0.3));
        library.update_sound(&ids[0], SoundPatch::shortcut(Some("q".to_string())));
        library.set_global_volume(0.7);
        library.save_config().unwrap();

        let (mut reloaded, _, _) = mock_library(store, &[]);
        reloaded.initialize();
        assert_eq!(library.sounds(), reloaded.sounds());
        assert_eq!(0.7, reloaded.global_volume());
    }

    #[test]
    fn test_playing_order() {
        let (mut library, _, _) = library_with(&["a.mp3", "b.mp3", "c.mp3"]);
        let ids: Vec<SoundId> = library.sounds().into_iter().map(|s| s.id).collect();
        library.play_sound(&ids[2]);
        library.play_sound(&ids[0]);
        assert_eq!(vec![ids[0].clone(), ids[2].clone()], library.playing());
    }

    #[test]
    fn test_import_sound() {
        let (mut library, _, _) = library_with(&[]);
        let id = library
            .import_sound(Path::new("/elsewhere/airhorn.wav"), Some("Horn"))
            .unwrap();
        let sound = library.sound(&id).unwrap();
        assert_eq!("airhorn.wav", sound.file);
        assert_eq!("Horn", sound.name);
    }
}
