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
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use tracing::info;

use soundboard::assets::SoundsDirectory;
use soundboard::audio;
use soundboard::config::Settings;
use soundboard::controller::{keyboard, Controller};
use soundboard::library::PlayOutcome;
use soundboard::sound::{Sound, SoundPatch};
use soundboard::soundboard::Soundboard;
use soundboard::store::JsonFileStore;
use soundboard::util::volume_percent;

/// Backend used by commands that only edit the catalog.
const CATALOG_BACKEND: &str = "mock-catalog";

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A keyboard-driven soundboard."
)]
struct Cli {
    /// The path to the settings file. Defaults are used if not given.
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the sounds on the board.
    Sounds {},
    /// Adds a sound to the board.
    Add {
        /// The audio file. A file name in the sounds directory, or a path with --import.
        file: String,
        /// The name shown on the button. Defaults to the file name.
        #[arg(short, long)]
        name: Option<String>,
        /// The icon shown on the button.
        #[arg(short, long)]
        icon: Option<String>,
        /// The button color as a hex string.
        #[arg(short, long)]
        color: Option<String>,
        /// The key that triggers the sound.
        #[arg(short = 'k', long)]
        shortcut: Option<String>,
        /// Copy the file into the sounds directory first.
        #[arg(long)]
        import: bool,
    },
    /// Removes a sound from the board.
    Remove {
        /// The ID or name of the sound.
        sound: String,
    },
    /// Changes a sound's name, icon, color, file or volume.
    Update {
        /// The ID or name of the sound.
        sound: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        icon: Option<String>,
        #[arg(short, long)]
        color: Option<String>,
        #[arg(short, long)]
        file: Option<String>,
        /// The sound's own volume, between 0 and 1.
        #[arg(short, long)]
        volume: Option<f32>,
    },
    /// Binds a key to a sound, taking it from any sound that had it.
    Bind {
        /// The ID or name of the sound.
        sound: String,
        /// The key.
        key: String,
    },
    /// Removes a sound's key binding.
    Unbind {
        /// The ID or name of the sound.
        sound: String,
    },
    /// Prints or sets the global volume.
    Volume {
        /// The new volume, between 0 and 1.
        volume: Option<f32>,
    },
    /// Plays a sound through the audio device and waits for it to finish.
    Play {
        /// The ID or name of the sound.
        sound: String,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Prints the effective settings.
    Settings {},
    /// Starts the interactive soundboard.
    Start {},
}

/// Opens the soundboard described by the settings with the given backend.
fn open(settings: &Settings, backend: Box<dyn audio::Backend>) -> Soundboard {
    Soundboard::new(
        Box::new(JsonFileStore::new(&settings.state_file())),
        Box::new(SoundsDirectory::new(&settings.sounds_directory())),
        backend,
        settings.shortcuts().binder_options(),
    )
}

/// Opens the soundboard for catalog edits, without touching the audio device.
fn open_catalog(settings: &Settings) -> Soundboard {
    open(settings, Box::new(audio::mock::Backend::new(CATALOG_BACKEND)))
}

fn find(soundboard: &Soundboard, id_or_name: &str) -> Result<Sound, Box<dyn Error>> {
    soundboard
        .find(id_or_name)
        .ok_or_else(|| format!("no sound with ID or name {}", id_or_name).into())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.settings.as_deref())?;

    match cli.command {
        Commands::Sounds {} => {
            let soundboard = open_catalog(&settings);
            if soundboard.sounds().is_empty() {
                println!(
                    "No sounds found in {}.",
                    settings.sounds_directory().display()
                );
                return Ok(());
            }
            print!("{}", soundboard);
        }
        Commands::Add {
            file,
            name,
            icon,
            color,
            shortcut,
            import,
        } => {
            let mut soundboard = open_catalog(&settings);
            let id = if import {
                let id = soundboard.import_sound(&PathBuf::from(&file), name.as_deref())?;
                if let Some(shortcut) = shortcut.as_deref() {
                    soundboard.set_shortcut(&id, Some(shortcut));
                }
                if icon.is_some() || color.is_some() {
                    soundboard.update_sound(
                        &id,
                        SoundPatch {
                            icon,
                            color,
                            ..Default::default()
                        },
                    );
                }
                id
            } else {
                soundboard.add_sound(
                    &file,
                    name.as_deref(),
                    icon.as_deref(),
                    color.as_deref(),
                    shortcut.as_deref(),
                )
            };
            soundboard.save()?;
            println!("Added {}", id);
        }
        Commands::Remove { sound } => {
            let mut soundboard = open_catalog(&settings);
            let sound = find(&soundboard, &sound)?;
            soundboard.remove_sound(&sound.id);
            soundboard.save()?;
            println!("Removed {} ({})", sound.name, sound.id);
        }
        Commands::Update {
            sound,
            name,
            icon,
            color,
            file,
            volume,
        } => {
            let mut soundboard = open_catalog(&settings);
            let sound = find(&soundboard, &sound)?;
            let patch = SoundPatch {
                name,
                file,
                color,
                icon,
                volume,
                shortcut: None,
            };
            if patch.is_empty() {
                return Err("nothing to update".into());
            }
            soundboard.update_sound(&sound.id, patch);
            soundboard.save()?;
            println!("Updated {}", sound.id);
        }
        Commands::Bind { sound, key } => {
            let mut soundboard = open_catalog(&settings);
            let sound = find(&soundboard, &sound)?;
            soundboard.set_shortcut(&sound.id, Some(&key));
            soundboard.save()?;
            println!("Bound {} to {}", key.to_lowercase(), sound.name);
        }
        Commands::Unbind { sound } => {
            let mut soundboard = open_catalog(&settings);
            let sound = find(&soundboard, &sound)?;
            soundboard.set_shortcut(&sound.id, None);
            soundboard.save()?;
            println!("Unbound {}", sound.name);
        }
        Commands::Volume { volume } => {
            let mut soundboard = open_catalog(&settings);
            if let Some(volume) = volume {
                soundboard.set_global_volume(volume);
                soundboard.save()?;
            }
            println!("Volume: {}", volume_percent(soundboard.global_volume()));
        }
        Commands::Play { sound } => {
            let device = settings.audio().device().to_string();
            if audio::is_mock_device(&device) {
                return Err(format!(
                    "cannot play through mock device {}: it never finishes",
                    device
                )
                .into());
            }
            let backend = audio::get_backend(&settings.audio())?;
            let mut soundboard = open(&settings, backend);
            let sound = find(&soundboard, &sound)?;

            match soundboard.play_sound(&sound.id) {
                PlayOutcome::Started => {
                    info!(sound = %sound.id, "Waiting for sound to finish.");
                    while soundboard.is_playing(&sound.id) {
                        tokio::time::sleep(settings.signal_poll_interval()).await;
                        soundboard.process_playback_signals();
                    }
                }
                outcome => {
                    return Err(format!("unable to play {}: {:?}", sound.name, outcome).into())
                }
            }
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Settings {} => {
            print!("{}", settings.to_yaml()?);
        }
        Commands::Start {} => {
            let backend = audio::get_backend(&settings.audio())?;
            info!(backend = %backend, "Using audio backend.");
            let mut soundboard = open(&settings, backend);
            soundboard.set_shortcuts_enabled(settings.shortcuts().enabled());
            print!("{}", soundboard);

            Controller::new(
                soundboard,
                Arc::new(keyboard::Driver::new()),
                settings.signal_poll_interval(),
            )
            .join()
            .await?;
        }
    }

    Ok(())
}
