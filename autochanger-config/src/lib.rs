//! Settings persistence for the autochanger vehicle script replacer.
//!
//! This crate provides loading, saving, and default values for the
//! process-wide settings: the script detection prefix, the dark-theme flag,
//! the re-prefix prompt suppression flag, an optional settings-file redirect,
//! and the recent-files list.

pub mod error;
pub mod settings;

// Re-export main types for convenience
pub use error::SettingsError;
pub use settings::{DEFAULT_DETECTION_PREFIX, MAX_RECENT_FILES, Settings};
