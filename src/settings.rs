//! Persisted alignment settings.
//!
//! Three integers — color tolerance and the backward/forward search
//! limits — survive between sessions in a small JSON document. They are
//! read once at session start and written back at session end **only when
//! the edited values validate**; invalid edits leave the persisted file
//! untouched.
//!
//! Values are stored as raw integers (not the validated [`AlignConfig`]
//! types) so an out-of-range value in the file round-trips into the same
//! configuration error a user would get typing it by hand.
//!
//! [`AlignConfig`]: crate::align::AlignConfig

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AlignError;

/// The persisted configuration for an alignment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignSettings {
    /// Max Lab-distance color tolerance (valid range 0–255).
    pub tolerance: i64,
    /// Maximum frames to track backwards (0 = unbounded).
    pub max_backward: i64,
    /// Maximum frames to track forwards (0 = unbounded).
    pub max_forward: i64,
}

impl Default for AlignSettings {
    fn default() -> Self {
        Self {
            tolerance: 5,
            max_backward: 0,
            max_forward: 0,
        }
    }
}

impl AlignSettings {
    /// Load settings from `path`.
    ///
    /// A missing or unreadable file yields the defaults; a file that does
    /// not parse as a settings document is logged and also yields the
    /// defaults. Loading never fails — a broken settings file must not
    /// block a session.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) => {
                log::debug!(
                    "No settings at {}: {error}; using defaults",
                    path.display()
                );
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(error) => {
                log::warn!(
                    "Ignoring malformed settings at {}: {error}",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Write the settings to `path`.
    ///
    /// Callers persist only values that already validated; this method
    /// does not re-validate.
    ///
    /// # Errors
    ///
    /// Returns [`AlignError::Settings`] when encoding fails and I/O errors
    /// from writing the file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AlignError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|error| AlignError::Settings {
                reason: error.to_string(),
            })?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
