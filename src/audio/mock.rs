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
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::{info, span, Level};

use crate::sound::SoundId;

use super::{next_playback_id, AudioError, PlaybackId, PlaybackSignal, SignalKind, SignalSender};

/// A playback instance the mock backend has handed out.
struct Voice {
    playback: PlaybackId,
    sound: SoundId,
    path: PathBuf,
    volume: f32,
    started: bool,
    stopped: bool,
    signals: SignalSender,
}

impl Voice {
    fn is_live(&self) -> bool {
        self.started && !self.stopped
    }
}

#[derive(Default)]
struct State {
    voices: Vec<Voice>,
    fail_loads: Option<String>,
    fail_starts: Option<String>,
}

/// A mock backend. Doesn't actually play anything, but records what it was asked to do so
/// tests can inspect it and finish or fail instances on demand. Clones share state.
#[derive(Clone)]
pub struct Backend {
    name: String,
    state: Arc<Mutex<State>>,
}

impl Backend {
    /// Gets the given mock backend.
    pub fn new(name: &str) -> Backend {
        Backend {
            name: name.to_string(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Makes every subsequent load fail with the given message, or succeed again with None.
    pub fn fail_loads(&self, message: Option<&str>) {
        self.state.lock().fail_loads = message.map(str::to_string);
    }

    /// Makes every subsequent start fail with the given message, or succeed again with None.
    pub fn fail_starts(&self, message: Option<&str>) {
        self.state.lock().fail_starts = message.map(str::to_string);
    }

    /// The volume applied to the live instance of the sound, if it's playing.
    pub fn applied_volume(&self, sound: &SoundId) -> Option<f32> {
        self.state
            .lock()
            .voices
            .iter()
            .rev()
            .find(|voice| &voice.sound == sound && voice.is_live())
            .map(|voice| voice.volume)
    }

    /// Returns true if the sound has a started, unstopped instance.
    pub fn is_live(&self, sound: &SoundId) -> bool {
        self.state
            .lock()
            .voices
            .iter()
            .any(|voice| &voice.sound == sound && voice.is_live())
    }

    /// The number of started, unstopped instances.
    pub fn live_count(&self) -> usize {
        self.state
            .lock()
            .voices
            .iter()
            .filter(|voice| voice.is_live())
            .count()
    }

    /// The number of instances ever loaded.
    pub fn load_count(&self) -> usize {
        self.state.lock().voices.len()
    }

    /// The path the most recent instance of the sound was loaded from.
    pub fn last_path(&self, sound: &SoundId) -> Option<PathBuf> {
        self.state
            .lock()
            .voices
            .iter()
            .rev()
            .find(|voice| &voice.sound == sound)
            .map(|voice| voice.path.clone())
    }

    /// Simulates the most recent instance of the sound reaching its end. The signal is sent
    /// even if the instance was already stopped, the way a late completion callback would be.
    pub fn finish(&self, sound: &SoundId) -> bool {
        self.signal(sound, SignalKind::Finished)
    }

    /// Simulates the most recent instance of the sound failing mid-playback.
    pub fn fail(&self, sound: &SoundId, message: &str) -> bool {
        self.signal(sound, SignalKind::Failed(message.to_string()))
    }

    fn signal(&self, sound: &SoundId, kind: SignalKind) -> bool {
        let mut state = self.state.lock();
        let Some(voice) = state
            .voices
            .iter_mut()
            .rev()
            .find(|voice| &voice.sound == sound)
        else {
            return false;
        };

        voice.stopped = true;
        voice
            .signals
            .send(PlaybackSignal {
                sound: sound.clone(),
                playback: voice.playback,
                kind,
            })
            .is_ok()
    }
}

impl super::Backend for Backend {
    fn load(
        &self,
        path: &Path,
        sound: &SoundId,
        signals: SignalSender,
    ) -> Result<Box<dyn super::Handle>, AudioError> {
        let span = span!(Level::INFO, "load sound (mock)");
        let _enter = span.enter();

        let mut state = self.state.lock();
        if let Some(message) = &state.fail_loads {
            return Err(AudioError::Decode {
                path: path.to_path_buf(),
                message: message.clone(),
            });
        }

        let playback = next_playback_id();
        info!(
            backend = self.name,
            sound = %sound,
            path = ?path,
            playback,
            "Loading sound."
        );
        state.voices.push(Voice {
            playback,
            sound: sound.clone(),
            path: path.to_path_buf(),
            volume: 1.0,
            started: false,
            stopped: false,
            signals,
        });

        Ok(Box::new(Handle {
            playback,
            state: self.state.clone(),
        }))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}

/// A handle to a mock playback instance.
pub struct Handle {
    playback: PlaybackId,
    state: Arc<Mutex<State>>,
}

impl Handle {
    fn with_voice<F: FnOnce(&mut Voice)>(&self, f: F) {
        if let Some(voice) = self
            .state
            .lock()
            .voices
            .iter_mut()
            .find(|voice| voice.playback == self.playback)
        {
            f(voice);
        }
    }
}

impl super::Handle for Handle {
    fn playback_id(&self) -> PlaybackId {
        self.playback
    }

    fn start(&mut self) -> Result<(), AudioError> {
        let fail_starts = self.state.lock().fail_starts.clone();
        if let Some(message) = fail_starts {
            return Err(AudioError::Playback(message));
        }
        self.with_voice(|voice| voice.started = true);
        Ok(())
    }

    fn stop(&mut self) {
        self.with_voice(|voice| voice.stopped = true);
    }

    fn set_volume(&mut self, volume: f32) {
        self.with_voice(|voice| voice.volume = volume);
    }
}

#[cfg(test)]
mod test {
    use crate::audio::{Backend as _, Handle as _};

    use super::*;

    #[test]
    fn test_mock_lifecycle() -> Result<(), AudioError> {
        let backend = Backend::new("mock-test");
        let (tx, rx) = crossbeam_channel::unbounded();
        let sound = SoundId::from("a");

        let mut handle = backend.load(Path::new("/sounds/a.wav"), &sound, tx)?;
        assert!(!backend.is_live(&sound));

        handle.set_volume(0.4);
        handle.start()?;
        assert!(backend.is_live(&sound));
        assert_eq!(Some(0.4), backend.applied_volume(&sound));
        assert_eq!(Some(PathBuf::from("/sounds/a.wav")), backend.last_path(&sound));

        assert!(backend.finish(&sound));
        assert!(!backend.is_live(&sound));
        let signal = rx.try_recv().expect("expected a signal");
        assert_eq!(handle.playback_id(), signal.playback);
        assert_eq!(SignalKind::Finished, signal.kind);
        Ok(())
    }

    #[test]
    fn test_mock_failures() {
        let backend = Backend::new("mock-test");
        let (tx, _rx) = crossbeam_channel::unbounded();
        let sound = SoundId::from("a");

        backend.fail_loads(Some("bad file"));
        assert!(backend.load(Path::new("a.wav"), &sound, tx.clone()).is_err());
        backend.fail_loads(None);

        backend.fail_starts(Some("device busy"));
        let mut handle = backend
            .load(Path::new("a.wav"), &sound, tx)
            .expect("load should succeed");
        assert!(matches!(handle.start(), Err(AudioError::Playback(_))));
        assert_eq!(0, backend.live_count());
        assert_eq!(1, backend.load_count());
        assert_eq!("mock-test (Mock)", backend.to_string());
    }
}
