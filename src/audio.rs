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
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Sender;

use crate::config;
use crate::sound::SoundId;

pub mod clip;
pub mod cpal;
mod error;
mod mixer;
pub mod mock;

pub use error::AudioError;

/// Identifies one playback instance. A sound played, stopped and played again gets a new one.
pub type PlaybackId = u64;

static NEXT_PLAYBACK_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a process-unique playback ID.
pub fn next_playback_id() -> PlaybackId {
    NEXT_PLAYBACK_ID.fetch_add(1, Ordering::Relaxed)
}

/// What happened to a playback instance, reported after the fact by the backend.
#[derive(Clone, Debug, PartialEq)]
pub enum SignalKind {
    /// Playback reached the end of the clip.
    Finished,
    /// Playback failed after it was started.
    Failed(String),
}

/// An asynchronous report from a playback instance.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackSignal {
    pub sound: SoundId,
    pub playback: PlaybackId,
    pub kind: SignalKind,
}

/// The sending half handed to backends so handles can report completion.
pub type SignalSender = Sender<PlaybackSignal>;

/// A loaded clip that can be started, stopped and have its volume changed while playing.
pub trait Handle: Send {
    /// The instance this handle controls.
    fn playback_id(&self) -> PlaybackId;

    /// Starts playback.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stops playback immediately. Stopping never reports a Finished signal.
    fn stop(&mut self);

    /// Sets the gain applied to this instance.
    fn set_volume(&mut self, volume: f32);
}

/// Something that can turn an audio file into a playable handle.
pub trait Backend: fmt::Display + Send {
    /// Loads the file at path for the given sound. Completion and late failures are reported
    /// through signals.
    fn load(
        &self,
        path: &Path,
        sound: &SoundId,
        signals: SignalSender,
    ) -> Result<Box<dyn Handle>, AudioError>;
}

/// Lists the output devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Returns true if the device name selects the mock backend, which never finishes on its own.
pub fn is_mock_device(device: &str) -> bool {
    device.starts_with("mock")
}

/// Gets the backend described by the audio configuration.
pub fn get_backend(config: &config::Audio) -> Result<Box<dyn Backend>, Box<dyn Error>> {
    let device = config.device();
    if is_mock_device(device) {
        return Ok(Box::new(mock::Backend::new(device)));
    };

    Ok(Box::new(cpal::Device::get(config)?))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_mock_device() {
        assert!(is_mock_device("mock"));
        assert!(is_mock_device("mock-device"));
        assert!(!is_mock_device("default"));
        assert!(!is_mock_device("USB Audio (mock)"));
    }
}
