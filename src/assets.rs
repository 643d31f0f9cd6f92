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

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::util::filename_display;

mod error;

pub use error::AssetError;

/// Extensions recognized as audio assets, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["mp3", "wav", "ogg"];

/// Returns true if the path has a supported audio extension.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Where audio assets live.
pub trait AssetStore: Send {
    /// Lists the file names of all available audio assets.
    fn list(&self) -> Result<Vec<String>, AssetError>;

    /// Resolves an asset file name to something playable.
    fn resolve(&self, file: &str) -> PathBuf;

    /// Copies an external file into the store and returns the file name it was stored under.
    fn import(&self, source: &Path) -> Result<String, AssetError>;
}

/// A directory on disk holding the audio assets.
pub struct SoundsDirectory {
    path: PathBuf,
}

impl SoundsDirectory {
    pub fn new(path: &Path) -> SoundsDirectory {
        SoundsDirectory {
            path: path.to_path_buf(),
        }
    }

    /// The directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(path: &Path, source: std::io::Error) -> AssetError {
        AssetError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Finds a file name that doesn't collide with an existing asset by adding a numeric suffix.
    fn unique_name(&self, file_name: &str) -> String {
        if !self.path.join(file_name).exists() {
            return file_name.to_string();
        }

        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let extension = path.extension().and_then(|e| e.to_str());

        (1..)
            .map(|n| match extension {
                Some(ext) => format!("{}-{}.{}", stem, n, ext),
                None => format!("{}-{}", stem, n),
            })
            .find(|candidate| !self.path.join(candidate).exists())
            .unwrap_or_else(|| file_name.to_string())
    }
}

impl AssetStore for SoundsDirectory {
    fn list(&self) -> Result<Vec<String>, AssetError> {
        if !self.path.exists() {
            info!(path = ?self.path, "Creating sounds directory");
            fs::create_dir_all(&self.path).map_err(|e| Self::io_error(&self.path, e))?;
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(|e| Self::io_error(&self.path, e))? {
            let entry = entry.map_err(|e| Self::io_error(&self.path, e))?;
            let path = entry.path();
            if path.is_file() && is_supported(&path) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    files.push(name.to_string());
                }
            }
        }

        files.sort();
        debug!(path = ?self.path, count = files.len(), "Listed audio assets");
        Ok(files)
    }

    fn resolve(&self, file: &str) -> PathBuf {
        self.path.join(file)
    }

    fn import(&self, source: &Path) -> Result<String, AssetError> {
        if !source.is_file() {
            return Err(AssetError::NotAFile(source.to_path_buf()));
        }
        if !is_supported(source) {
            return Err(AssetError::Unsupported(source.to_path_buf()));
        }

        fs::create_dir_all(&self.path).map_err(|e| Self::io_error(&self.path, e))?;
        let file_name = self.unique_name(filename_display(source));
        let destination = self.path.join(&file_name);
        fs::copy(source, &destination).map_err(|e| Self::io_error(&destination, e))?;

        info!(source = ?source, file = file_name, "Imported audio asset");
        Ok(file_name)
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_is_supported() {
        assert!(is_supported(Path::new("tap.mp3")));
        assert!(is_supported(Path::new("BEEP.WAV")));
        assert!(is_supported(Path::new("dir/horn.Ogg")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("noext")));
    }

    #[test]
    fn test_list_filters_and_sorts() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        for file in ["tap.mp3", "beep.wav", "readme.txt", "horn.OGG"] {
            fs::write(dir.path().join(file), b"")?;
        }
        fs::create_dir(dir.path().join("nested.wav"))?;

        let assets = SoundsDirectory::new(dir.path());
        assert_eq!(vec!["beep.wav", "horn.OGG", "tap.mp3"], assets.list()?);
        Ok(())
    }

    #[test]
    fn test_list_creates_missing_directory() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sounds");

        let assets = SoundsDirectory::new(&path);
        assert!(assets.list()?.is_empty());
        assert!(path.is_dir());
        Ok(())
    }

    #[test]
    fn test_resolve() {
        let assets = SoundsDirectory::new(Path::new("/srv/sounds"));
        assert_eq!(PathBuf::from("/srv/sounds/tap.mp3"), assets.resolve("tap.mp3"));
    }

    #[test]
    fn test_import() -> Result<(), Box<dyn Error>> {
        let source_dir = tempfile::tempdir()?;
        let source = source_dir.path().join("tap.mp3");
        fs::write(&source, b"data")?;

        let dir = tempfile::tempdir()?;
        let assets = SoundsDirectory::new(&dir.path().join("sounds"));

        assert_eq!("tap.mp3", assets.import(&source)?);
        assert_eq!("tap-1.mp3", assets.import(&source)?);
        assert_eq!(b"data".to_vec(), fs::read(assets.resolve("tap-1.mp3"))?);

        let text = source_dir.path().join("notes.txt");
        fs::write(&text, b"")?;
        assert!(matches!(
            assets.import(&text),
            Err(AssetError::Unsupported(_))
        ));
        assert!(matches!(
            assets.import(&source_dir.path().join("missing.wav")),
            Err(AssetError::NotAFile(_))
        ));
        Ok(())
    }
}
