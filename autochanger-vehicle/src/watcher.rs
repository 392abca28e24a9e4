//! Vehicle file watcher for automatic reload.
//!
//! Watches the loaded vehicle file for external changes (the game saving
//! over it, an editor touching it) and coalesces bursts of events with a
//! trailing-edge debounce: every raw event restarts a quiet timer, and only
//! when the timer finally expires is a single event delivered. A deletion
//! observed at that point is reported as [`VehicleWatchEvent::Removed`] so
//! the application clears its session instead of reloading.

use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, Event, PollWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread;
use std::time::Duration;

/// Default quiet period between the last raw event and the reload trigger.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Coalesced result of a burst of filesystem events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleWatchEvent {
    /// The file changed on disk and still exists; reload it.
    Changed,
    /// The file is gone; clear the editor session.
    Removed,
}

/// Watches the vehicle file and sends debounced change events.
pub struct VehicleWatcher {
    /// The file system watcher (kept alive to maintain watching).
    _watcher: Box<dyn Watcher + Send>,
    /// Receiver for debounced vehicle change events.
    event_receiver: Receiver<VehicleWatchEvent>,
}

impl std::fmt::Debug for VehicleWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VehicleWatcher").finish_non_exhaustive()
    }
}

/// Build the raw event handler shared by both watcher backends.
///
/// Filters events down to the vehicle's file name across modify, create,
/// remove, and rename notifications, and forwards a unit ping per event; the
/// debounce loop does the coalescing and the changed-vs-removed call.
fn make_event_handler(
    filename: std::ffi::OsString,
    tx: Sender<()>,
) -> impl Fn(std::result::Result<Event, notify::Error>) + Send + 'static {
    move |result: std::result::Result<Event, notify::Error>| {
        if let Ok(event) = result {
            if !matches!(
                event.kind,
                notify::EventKind::Modify(_)
                    | notify::EventKind::Create(_)
                    | notify::EventKind::Remove(_)
            ) {
                return;
            }

            let matches_vehicle: bool = event
                .paths
                .iter()
                .any(|p: &PathBuf| p.file_name().map(|f| f == filename).unwrap_or(false));

            if !matches_vehicle {
                return;
            }

            // Receiver gone means the watcher was dropped; nothing to do.
            let _ = tx.send(());
        }
    }
}

/// Trailing-edge debounce loop.
///
/// Blocks for a raw event, then keeps draining until `quiet` elapses with no
/// further events, so N rapid events inside the window produce exactly one
/// output. The file's existence is checked only once the window closes, so a
/// delete-then-recreate burst counts as a change, not a removal.
fn run_debounce(
    raw_events: Receiver<()>,
    out: Sender<VehicleWatchEvent>,
    quiet: Duration,
    path: PathBuf,
) {
    while raw_events.recv().is_ok() {
        loop {
            match raw_events.recv_timeout(quiet) {
                Ok(()) => continue,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }

        let event = if path.exists() {
            VehicleWatchEvent::Changed
        } else {
            VehicleWatchEvent::Removed
        };
        log::info!("Vehicle file event after debounce: {event:?}");
        if out.send(event).is_err() {
            return;
        }
    }
}

impl VehicleWatcher {
    /// Create a new vehicle watcher with the default debounce delay.
    pub fn new(vehicle_path: &Path) -> Result<Self> {
        Self::with_debounce(vehicle_path, DEFAULT_DEBOUNCE_MS)
    }

    /// Create a new vehicle watcher.
    ///
    /// Attempts the platform's native watcher (inotify on Linux, kqueue on
    /// macOS, ReadDirectoryChanges on Windows) and falls back to a
    /// `PollWatcher` when the native backend fails to initialise (container,
    /// network filesystem). The parent directory is watched non-recursively
    /// and events are filtered to the vehicle's file name.
    ///
    /// # Errors
    /// Returns an error if the vehicle file doesn't exist or watching fails
    /// on both backends. Callers log and continue without live reload.
    pub fn with_debounce(vehicle_path: &Path, debounce_delay_ms: u64) -> Result<Self> {
        if !vehicle_path.exists() {
            anyhow::bail!("Vehicle file not found: {}", vehicle_path.display());
        }

        let canonical: PathBuf = vehicle_path
            .canonicalize()
            .unwrap_or_else(|_| vehicle_path.to_path_buf());

        let filename: std::ffi::OsString = canonical
            .file_name()
            .context("Vehicle path has no filename")?
            .to_os_string();

        let parent_dir: PathBuf = canonical
            .parent()
            .context("Vehicle path has no parent directory")?
            .to_path_buf();

        let (raw_tx, raw_rx) = channel::<()>();
        let (event_tx, event_rx) = channel::<VehicleWatchEvent>();

        let mut watcher: Box<dyn Watcher + Send> = Self::create_watcher(filename, raw_tx)?;
        watcher
            .watch(&parent_dir, RecursiveMode::NonRecursive)
            .with_context(|| {
                format!("Failed to watch vehicle directory: {}", parent_dir.display())
            })?;

        let quiet = Duration::from_millis(debounce_delay_ms);
        let debounce_path = canonical.clone();
        thread::Builder::new()
            .name("vehicle-debounce".into())
            .spawn(move || run_debounce(raw_rx, event_tx, quiet, debounce_path))
            .context("Failed to spawn debounce thread")?;

        log::info!("Vehicle live reload: watching {}", canonical.display());

        Ok(Self {
            _watcher: watcher,
            event_receiver: event_rx,
        })
    }

    /// Try to create the best available watcher backend.
    fn create_watcher(
        filename: std::ffi::OsString,
        tx: Sender<()>,
    ) -> Result<Box<dyn Watcher + Send>> {
        let filename2 = filename.clone();
        let tx2 = tx.clone();

        let handler = make_event_handler(filename, tx);

        match notify::recommended_watcher(handler) {
            Ok(w) => {
                log::debug!("Vehicle watcher: using native (RecommendedWatcher) backend");
                Ok(Box::new(w))
            }
            Err(e) => {
                log::warn!(
                    "Vehicle watcher: native backend unavailable ({}); falling back to PollWatcher",
                    e
                );
                let fallback_handler = make_event_handler(filename2, tx2);
                let poll_watcher = PollWatcher::new(
                    fallback_handler,
                    NotifyConfig::default().with_poll_interval(Duration::from_millis(500)),
                )
                .context("Failed to create fallback PollWatcher")?;
                Ok(Box::new(poll_watcher))
            }
        }
    }

    /// Check for a pending debounced event (non-blocking).
    pub fn try_recv(&self) -> Option<VehicleWatchEvent> {
        self.event_receiver.try_recv().ok()
    }
}
