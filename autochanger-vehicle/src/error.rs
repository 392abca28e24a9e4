//! Typed error variants for the autochanger-vehicle crate.

use std::path::PathBuf;

/// Errors that can occur while loading, parsing, or saving a vehicle file.
///
/// The underlying parser or I/O message is always preserved so user-facing
/// dialogs and the remote endpoint can surface it.
#[derive(Debug, thiserror::Error)]
pub enum VehicleError {
    /// An I/O error occurred reading or writing the vehicle file.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The vehicle file contained malformed XML.
    #[error("malformed vehicle XML: {0}")]
    Parse(String),

    /// The vehicle file was not valid UTF-8.
    #[error("vehicle file is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// Validation failures of the in-memory replace operation.
///
/// These are user errors, not I/O errors; callers surface them as warnings
/// (or translated JSON reasons when driven remotely) and must not conflate
/// them with [`VehicleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReplaceError {
    /// No script is selected in the session.
    #[error("no script selected")]
    NoSelection,

    /// The replacement text is empty or whitespace-only.
    #[error("replacement script is blank")]
    BlankScript,
}
