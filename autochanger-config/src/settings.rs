//! Settings loading, saving, and default values.
//!
//! Settings live in a single JSON file. The default location is next to the
//! executable when that directory is writable (portable install), otherwise
//! the per-user config directory. A settings file may redirect to a custom
//! location via `settings_file_path`; the redirect is followed once at load
//! time and every subsequent save goes to the redirected file.

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Maximum number of entries kept in the recent-files list.
pub const MAX_RECENT_FILES: usize = 10;

/// Default marker comment identifying managed scripts.
pub const DEFAULT_DETECTION_PREFIX: &str = "-- autochanger";

/// Settings file name, used both next to the executable and in the per-user
/// config directory.
const SETTINGS_FILENAME: &str = "settings.json";

/// Process-wide settings, loaded once at startup and flushed on every
/// mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Marker comment a script attribute must start with to be detected.
    pub detection_prefix: String,

    /// Skip the confirmation dialog when a save would re-add the detection
    /// prefix to edited scripts.
    pub suppress_reprefix_prompt: bool,

    /// Dark UI theme.
    pub dark_theme: bool,

    /// Optional redirect to a custom settings file location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_file_path: Option<String>,

    /// Recently opened vehicle files, most recent first.
    pub recent_files: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            detection_prefix: DEFAULT_DETECTION_PREFIX.to_string(),
            suppress_reprefix_prompt: false,
            dark_theme: true,
            settings_file_path: None,
            recent_files: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from the default location, following a configured
    /// redirect once. Returns the settings together with the path every
    /// subsequent save must target.
    ///
    /// A missing or corrupt file never fails the application start: it falls
    /// back to defaults (logged at warn level).
    pub fn load() -> (Self, PathBuf) {
        let default_path = Self::default_path();
        log::info!("Settings path: {:?}", default_path);

        let settings = Self::load_from_path(&default_path);

        if let Some(redirect) = settings.settings_file_path.clone() {
            let redirect_path = PathBuf::from(&redirect);
            if redirect_path != default_path {
                log::info!("Settings redirect to {:?}", redirect_path);
                let mut redirected = Self::load_from_path(&redirect_path);
                // Keep the pointer so the redirect survives a save cycle.
                redirected.settings_file_path = Some(redirect);
                return (redirected, redirect_path);
            }
        }

        (settings, default_path)
    }

    /// Load settings from an explicit path, falling back to defaults when the
    /// file is absent or cannot be parsed.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!(
                        "Corrupt settings file {:?} ({e}), falling back to defaults",
                        path
                    );
                    Self::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("Settings file not found at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                log::warn!(
                    "Failed to read settings file {:?} ({e}), falling back to defaults",
                    path
                );
                Self::default()
            }
        }
    }

    /// Save settings to the given path, creating parent directories as
    /// needed. Called after every mutation.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }

    /// Default settings file path: next to the executable if that directory
    /// is writable, otherwise under the per-user config directory.
    pub fn default_path() -> PathBuf {
        if let Some(exe_dir) = exe_dir()
            && dir_is_writable(&exe_dir)
        {
            return exe_dir.join(SETTINGS_FILENAME);
        }

        if let Some(config_dir) = dirs::config_dir() {
            return config_dir.join("autochanger").join(SETTINGS_FILENAME);
        }

        // Fallback if neither location can be determined
        PathBuf::from(SETTINGS_FILENAME)
    }

    /// Promote a vehicle file to the front of the recent-files list.
    ///
    /// Entries are deduplicated case-insensitively (Windows paths) and the
    /// list is capped at [`MAX_RECENT_FILES`].
    pub fn add_recent_file(&mut self, path: &str) {
        let lowered = path.to_lowercase();
        self.recent_files.retain(|p| p.to_lowercase() != lowered);
        self.recent_files.insert(0, path.to_string());
        self.recent_files.truncate(MAX_RECENT_FILES);
    }
}

fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Probe whether `dir` accepts new files. Program Files and similar system
/// locations typically do not, which routes settings to the per-user dir.
fn dir_is_writable(dir: &Path) -> bool {
    let probe = dir.join(".autochanger-write-probe");
    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)
    {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        // A leftover probe from a crashed run still proves writability.
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => true,
        Err(_) => false,
    }
}
