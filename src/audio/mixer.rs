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

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::sound::SoundId;

use super::clip::Clip;
use super::{PlaybackId, PlaybackSignal, SignalKind, SignalSender};

/// Controls shared between a handle and the voice it started.
pub(super) struct VoiceControl {
    /// f32 gain stored as bits.
    volume: AtomicU32,
    stopped: AtomicBool,
}

impl VoiceControl {
    pub fn new(volume: f32) -> VoiceControl {
        VoiceControl {
            volume: AtomicU32::new(volume.to_bits()),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume.store(volume.to_bits(), Ordering::Relaxed);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

/// A clip being played.
pub(super) struct Voice {
    playback: PlaybackId,
    sound: SoundId,
    clip: Clip,
    /// Next frame to play.
    position: usize,
    control: Arc<VoiceControl>,
    signals: SignalSender,
}

impl Voice {
    pub fn new(
        playback: PlaybackId,
        sound: SoundId,
        clip: Clip,
        control: Arc<VoiceControl>,
        signals: SignalSender,
    ) -> Voice {
        Voice {
            playback,
            sound,
            clip,
            position: 0,
            control,
            signals,
        }
    }

    /// Adds this voice into the output. Returns false once the voice is done.
    fn mix_into(&mut self, output: &mut [f32], channels: usize) -> bool {
        if self.control.is_stopped() {
            return false;
        }

        let volume = self.control.volume();
        let clip_channels = self.clip.channel_count() as usize;
        let frames = output.len() / channels;
        let count = self.clip.frames().saturating_sub(self.position).min(frames);

        for frame in 0..count {
            for channel in 0..channels {
                output[frame * channels + channel] +=
                    self.clip.sample(self.position + frame, channel % clip_channels) * volume;
            }
        }
        self.position += count;

        if self.position >= self.clip.frames() {
            self.report(SignalKind::Finished);
            return false;
        }
        true
    }

    /// Reports a failure unless the voice was already stopped.
    fn fail(&self, message: &str) {
        if !self.control.is_stopped() {
            self.report(SignalKind::Failed(message.to_string()));
        }
    }

    fn report(&self, kind: SignalKind) {
        // The library may already be gone during shutdown.
        let _ = self.signals.send(PlaybackSignal {
            sound: self.sound.clone(),
            playback: self.playback,
            kind,
        });
    }
}

/// The voices a mixer is playing, shared with the stream's error callback.
#[derive(Clone)]
pub(super) struct LiveVoices {
    voices: Arc<Mutex<Vec<Voice>>>,
    incoming: Receiver<Voice>,
}

impl LiveVoices {
    /// Fails every voice that's playing or waiting to play and drops them all. Returns how
    /// many voices were dropped.
    pub fn fail_all(&self, message: &str) -> usize {
        let mut voices = self.voices.lock();
        voices.extend(self.incoming.try_iter());
        for voice in voices.iter() {
            voice.fail(message);
        }
        let count = voices.len();
        voices.clear();
        count
    }
}

/// Mixes every playing voice down to the device's channels.
pub(super) struct Mixer {
    channels: u16,
    live: LiveVoices,
}

impl Mixer {
    pub fn new(channels: u16, incoming: Receiver<Voice>) -> Mixer {
        Mixer {
            channels: channels.max(1),
            live: LiveVoices {
                voices: Arc::new(Mutex::new(Vec::new())),
                incoming,
            },
        }
    }

    /// The voices this mixer plays, for failing them from outside the callback.
    pub fn live_voices(&self) -> LiveVoices {
        self.live.clone()
    }

    /// Fills the interleaved output buffer with the sum of all voices.
    pub fn mix_into(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        let channels = self.channels as usize;

        let mut voices = self.live.voices.lock();
        voices.extend(self.live.incoming.try_iter());
        voices.retain_mut(|voice| voice.mix_into(output, channels));
    }

    /// Returns the number of voices still playing.
    pub fn voice_count(&self) -> usize {
        self.live.voices.lock().len()
    }
}
