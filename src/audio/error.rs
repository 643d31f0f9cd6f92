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
use std::path::PathBuf;

/// Failures loading or playing audio.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("unable to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("{0} has no audio track")]
    NoTrack(PathBuf),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("output stream error: {0}")]
    Stream(String),

    #[error("playback failed: {0}")]
    Playback(String),
}
