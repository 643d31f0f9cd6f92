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
use serde::{Deserialize, Serialize};

use crate::shortcuts::{normalize_key, BinderOptions};

const DEFAULT_STOP_ALL_KEY: &str = "Escape";

/// A YAML representation of the keyboard shortcut configuration.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Shortcuts {
    /// The key that stops every playing sound.
    stop_all_key: Option<String>,

    /// Whether the stop-all key still works while shortcuts are disabled.
    stop_all_bypasses_inactive: Option<bool>,

    /// Whether shortcuts start out enabled.
    enabled: Option<bool>,
}

impl Shortcuts {
    /// Returns the normalized stop-all key (default: escape).
    pub fn stop_all_key(&self) -> String {
        normalize_key(self.stop_all_key.as_deref().unwrap_or(DEFAULT_STOP_ALL_KEY))
    }

    /// Returns whether the stop-all key ignores the enabled flag (default: false).
    pub fn stop_all_bypasses_inactive(&self) -> bool {
        self.stop_all_bypasses_inactive.unwrap_or(false)
    }

    /// Returns whether shortcuts start enabled (default: true).
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Converts the configuration into binder options.
    pub fn binder_options(&self) -> BinderOptions {
        BinderOptions {
            stop_all_key: self.stop_all_key(),
            stop_all_bypasses_inactive: self.stop_all_bypasses_inactive(),
        }
    }
}
