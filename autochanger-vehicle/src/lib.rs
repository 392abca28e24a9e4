//! Vehicle XML handling for the autochanger script replacer.
//!
//! This crate owns everything between a vehicle file on disk and the list of
//! managed Lua scripts shown to the user:
//!
//! - Whitespace-exact document model (embedded script text survives a
//!   load → save round trip byte-for-byte)
//! - Script detection and display-label derivation
//! - Editor session state (selection, replacement, reload)
//! - Persistence (re-prefixing edited scripts, atomic save)
//! - File watcher with trailing-edge debounce for external changes

pub mod detect;
pub mod document;
pub mod error;
pub mod persist;
pub mod session;
pub mod watcher;

// Re-export main types for convenience
pub use detect::{ScriptRecord, derive_label, detect_scripts};
pub use document::{NodeId, VehicleDocument};
pub use error::{ReplaceError, VehicleError};
pub use persist::{ReprefixEntry, apply_reprefix, load_document, reprefix_plan, save_document};
pub use session::EditorSession;
pub use watcher::{VehicleWatchEvent, VehicleWatcher};
