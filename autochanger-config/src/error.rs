//! Typed error variants for the autochanger-config crate.
//!
//! Exposed for callers who want to match on specific failure modes instead of
//! opaque strings. `Settings::load` deliberately does not return these (a
//! missing or corrupt settings file falls back to defaults), but path
//! resolution and saving do.

use std::path::PathBuf;

/// Errors that can occur when resolving, reading, or writing settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// An I/O error occurred reading or writing the settings file.
    #[error("I/O error on settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings could not be serialized to JSON.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No writable location for the settings file could be determined.
    #[error("no writable settings location (no executable directory and no user config directory)")]
    NoWritableLocation,
}
