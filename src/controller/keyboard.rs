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

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;

const QUIT: &str = ":quit";
const TOGGLE: &str = ":toggle";
const STOP: &str = ":stop";
const LIST: &str = ":list";
const SAVE: &str = ":save";
const VOLUME: &str = ":volume";

/// A driver that reads key presses from the terminal, one per line. Lines starting with a
/// colon are commands.
pub struct Driver {}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Parses one line of input. Returns None for blank lines and unrecognized commands.
    fn parse(input: &str) -> Option<Event> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if !input.starts_with(':') {
            return Some(Event::Key(input.to_string()));
        }

        let mut parts = input.split_whitespace();
        let command = parts.next().unwrap_or_default().to_lowercase();
        match command.as_str() {
            QUIT => Some(Event::Quit),
            TOGGLE => Some(Event::ToggleShortcuts),
            STOP => Some(Event::StopAll),
            LIST => Some(Event::List),
            SAVE => Some(Event::Save),
            VOLUME => match parts.next().map(str::parse::<f32>) {
                Some(Ok(volume)) => Some(Event::Volume(volume)),
                _ => {
                    warn!(input, "Volume needs a number between 0 and 1");
                    None
                }
            },
            _ => {
                warn!(input, "Unrecognized command");
                None
            }
        }
    }

    /// Reads and dispatches one line. Returns false once input is exhausted or quit was sent.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Key ({}, {}, {}, {}, {}, {} <0-1>): ",
            QUIT, TOGGLE, STOP, LIST, SAVE, VOLUME,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            events_tx
                .blocking_send(Event::Quit)
                .map_err(io::Error::other)?;
            return Ok(false);
        }

        let Some(event) = Self::parse(&input) else {
            return Ok(true);
        };
        let keep_going = event != Event::Quit;
        events_tx.blocking_send(event).map_err(io::Error::other)?;
        Ok(keep_going)
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}

            info!("Keyboard driver stopped.");
            Ok(())
        })
    }
}
