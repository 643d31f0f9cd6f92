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
    error::Error,
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;

use crate::assets::{AssetError, AssetStore};
use crate::audio::mock;
use crate::library::SoundLibrary;
use crate::store::MemoryStore;

/// Writes a 16-bit WAV file. Each inner vector is one channel; they're interleaved on write.
pub fn write_wav(
    path: PathBuf,
    samples: &[Vec<i16>],
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let channels = samples.len().max(1);
    let mut writer = WavWriter::new(
        file,
        WavSpec {
            channels: channels as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )?;

    let frames = samples.iter().map(Vec::len).max().unwrap_or(0);
    for frame in 0..frames {
        for channel in samples {
            writer.write_sample(channel.get(frame).copied().unwrap_or(0))?;
        }
    }
    writer.finalize()?;

    Ok(())
}

/// An asset store with a fixed listing. Clones share the listing.
#[derive(Clone, Default)]
pub struct FixedAssets {
    files: Arc<Mutex<Vec<String>>>,
    fail_list: Arc<Mutex<bool>>,
}

impl FixedAssets {
    pub fn new(files: &[&str]) -> FixedAssets {
        FixedAssets {
            files: Arc::new(Mutex::new(files.iter().map(|f| f.to_string()).collect())),
            fail_list: Arc::new(Mutex::new(false)),
        }
    }

    /// Makes listing fail.
    pub fn set_fail_list(&self, fail: bool) {
        *self.fail_list.lock() = fail;
    }
}

impl AssetStore for FixedAssets {
    fn list(&self) -> Result<Vec<String>, AssetError> {
        if *self.fail_list.lock() {
            return Err(AssetError::Io {
                path: PathBuf::from("/fixed"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        Ok(self.files.lock().clone())
    }

    fn resolve(&self, file: &str) -> PathBuf {
        Path::new("/fixed").join(file)
    }

    fn import(&self, source: &Path) -> Result<String, AssetError> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AssetError::NotAFile(source.to_path_buf()))?
            .to_string();
        self.files.lock().push(name.clone());
        Ok(name)
    }
}

/// Builds a library over a mock backend, a memory store and the given asset listing. The
/// returned backend and store share state with the ones the library owns.
pub fn mock_library(
    store: MemoryStore,
    files: &[&str],
) -> (SoundLibrary, mock::Backend, MemoryStore) {
    let backend = mock::Backend::new("mock-device");
    let library = SoundLibrary::new(
        Box::new(store.clone()),
        Box::new(FixedAssets::new(files)),
        Box::new(backend.clone()),
    );
    (library, backend, store)
}
