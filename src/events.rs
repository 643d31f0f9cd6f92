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
use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

use crate::sound::SoundId;

/// Notifications emitted by the sound library for presentation to consume.
#[derive(Clone, Debug, PartialEq)]
pub enum SoundEvent {
    /// A sound started playing.
    Started { id: SoundId },

    /// A sound stopped, either because it reached the end or because it was stopped.
    Ended { id: SoundId },

    /// A sound failed to load or play.
    Error { id: SoundId, message: String },

    /// The global volume changed. Carries the clamped value.
    VolumeChanged { volume: f32 },
}

/// Fans events out to every subscriber. Subscribers that have gone away are dropped.
#[derive(Default)]
pub struct Notifier {
    subscribers: Vec<Sender<SoundEvent>>,
}

impl Notifier {
    pub fn new() -> Notifier {
        Notifier {
            subscribers: Vec::new(),
        }
    }

    /// Registers a new subscriber and returns the receiving end of its channel.
    pub fn subscribe(&mut self) -> Receiver<SoundEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Sends the event to all live subscribers.
    pub fn emit(&mut self, event: SoundEvent) {
        debug!(event = ?event, "Emitting event");
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fan_out() {
        let mut notifier = Notifier::new();
        let first = notifier.subscribe();
        let second = notifier.subscribe();

        notifier.emit(SoundEvent::VolumeChanged { volume: 0.5 });

        assert_eq!(
            SoundEvent::VolumeChanged { volume: 0.5 },
            first.try_recv().unwrap()
        );
        assert_eq!(
            SoundEvent::VolumeChanged { volume: 0.5 },
            second.try_recv().unwrap()
        );
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut notifier = Notifier::new();
        let kept = notifier.subscribe();
        drop(notifier.subscribe());
        assert_eq!(2, notifier.subscriber_count());

        notifier.emit(SoundEvent::Ended {
            id: SoundId::from("a"),
        });
        assert_eq!(1, notifier.subscriber_count());
        assert!(kept.try_recv().is_ok());
    }
}
