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
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, Sender};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, span, warn, Instrument, Level};

use crate::events::SoundEvent;
use crate::shortcuts::{FocusContext, KeyDisposition};
use crate::sound::SoundId;
use crate::soundboard::Soundboard;

pub mod keyboard;

/// Controller events that drive the soundboard.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A key was pressed on the board.
    Key(String),

    /// Turns shortcut handling on or off.
    ToggleShortcuts,

    /// Stops every playing sound, regardless of whether shortcuts are on.
    StopAll,

    /// Prints the sound catalog.
    List,

    /// Saves the soundboard.
    Save,

    /// Sets the global volume.
    Volume(f32),

    /// Stops the controller.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Runs a soundboard, feeding it events from a driver.
pub struct Controller {
    handle: JoinHandle<Soundboard>,
}

impl Controller {
    /// Creates a new controller with the given driver. Finished sounds are collected every
    /// poll interval.
    pub fn new(
        soundboard: Soundboard,
        driver: Arc<dyn Driver>,
        poll_interval: Duration,
    ) -> Controller {
        Controller {
            handle: tokio::spawn(
                Controller::trigger_events(soundboard, driver, poll_interval)
                    .instrument(span!(Level::INFO, "controller")),
            ),
        }
    }

    /// Join will block until the controller finishes. Returns the soundboard.
    pub async fn join(&mut self) -> Result<Soundboard, JoinError> {
        (&mut self.handle).await
    }

    /// Triggers soundboard events by watching the driver and getting events from it.
    async fn trigger_events(
        mut soundboard: Soundboard,
        driver: Arc<dyn Driver>,
        poll_interval: Duration,
    ) -> Soundboard {
        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);
        let notifications = soundboard.subscribe();
        let mut poll = tokio::time::interval(poll_interval);

        info!(
            sounds = soundboard.sounds().len(),
            shortcuts = soundboard.shortcuts_active(),
            "Controller started."
        );

        loop {
            tokio::select! {
                event = events_rx.recv() => {
                    let Some(event) = event else {
                        info!("Event source closed.");
                        break;
                    };
                    info!(event = format!("{:?}", event), "Received event.");
                    if !Controller::handle_event(&mut soundboard, event) {
                        break;
                    }
                }
                _ = poll.tick() => {
                    soundboard.process_playback_signals();
                }
            }

            for notification in notifications.try_iter() {
                Controller::report(&soundboard, notification);
            }
        }

        info!("Controller closing.");
        drop(events_rx);
        soundboard.stop_all_sounds();
        if let Err(e) = soundboard.save() {
            error!(err = %e, "Error saving soundboard on exit");
        }
        for notification in notifications.try_iter() {
            Controller::report(&soundboard, notification);
        }

        if let Err(e) = join_handle.await {
            error!("Error waiting for event monitor to stop: {}", e);
        }
        soundboard
    }

    /// Applies an event to the soundboard. Returns false when the controller should stop.
    fn handle_event(soundboard: &mut Soundboard, event: Event) -> bool {
        match event {
            Event::Key(key) => {
                let disposition = soundboard.handle_key_event(&key, FocusContext::Board);
                if disposition == KeyDisposition::PassThrough {
                    warn!(key, "No sound bound to key");
                }
            }
            Event::ToggleShortcuts => {
                let active = soundboard.toggle_shortcuts();
                println!("Shortcuts {}", if active { "enabled" } else { "disabled" });
            }
            Event::StopAll => {
                soundboard.stop_all_sounds();
            }
            Event::List => print!("{}", soundboard),
            Event::Save => {
                if let Err(e) = soundboard.save() {
                    error!(err = %e, "Error saving soundboard");
                }
            }
            Event::Volume(volume) => {
                soundboard.set_global_volume(volume);
            }
            Event::Quit => return false,
        }
        true
    }

    /// Logs a library notification.
    fn report(soundboard: &Soundboard, notification: SoundEvent) {
        let name = |id: &SoundId| {
            soundboard
                .sound(id)
                .map(|sound| sound.name)
                .unwrap_or_default()
        };
        match notification {
            SoundEvent::Started { id } => info!(sound = %id, name = name(&id), "Started."),
            SoundEvent::Ended { id } => info!(sound = %id, name = name(&id), "Ended."),
            SoundEvent::Error { id, message } => {
                error!(sound = %id, name = name(&id), err = %message, "Sound error.")
            }
            SoundEvent::VolumeChanged { volume } => info!(volume, "Volume changed."),
        }
    }
}
