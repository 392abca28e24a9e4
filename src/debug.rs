//! Unified logging for autochanger.
//!
//! Routes all `log::info!()` etc. to a session log file in the temp
//! directory (`autochanger_debug.log`), keeping diagnostics out of the way
//! of the GUI. When `RUST_LOG` is set, records are also mirrored to stderr
//! for terminal debugging, and its value selects the level.

use log::{LevelFilter, Metadata, Record};
use parking_lot::Mutex;
use std::fs::File;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

struct LogBridge {
    file: Mutex<Option<File>>,
    mirror_stderr: bool,
}

fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("{}.{:03}", d.as_secs(), d.subsec_millis()),
        Err(_) => "0.000".to_string(),
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] [{:<5}] {}: {}\n",
            timestamp(),
            record.level(),
            record.target(),
            record.args()
        );
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.write_all(line.as_bytes());
        }
        if self.mirror_stderr {
            eprint!("{line}");
        }
    }

    fn flush(&self) {
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }
}

/// Parse `RUST_LOG` as a plain level name; absent or unparsable means Info.
fn parse_level(value: &str) -> LevelFilter {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Install the log bridge. Safe to call once at startup; a second call is a
/// no-op because the global logger is already set.
pub fn init_log_bridge() {
    let log_path = std::env::temp_dir().join("autochanger_debug.log");
    let file = File::create(&log_path).ok();

    let bridge = Box::new(LogBridge {
        file: Mutex::new(file),
        mirror_stderr: std::env::var_os("RUST_LOG").is_some(),
    });

    if log::set_boxed_logger(bridge).is_ok() {
        let level = std::env::var("RUST_LOG")
            .map(|v| parse_level(&v))
            .unwrap_or(LevelFilter::Info);
        log::set_max_level(level);
        log::info!("Log bridge initialized at {}", log_path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_names() {
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("ERROR"), LevelFilter::Error);
        assert_eq!(parse_level(" warn "), LevelFilter::Warn);
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("trace"), LevelFilter::Trace);
        assert_eq!(parse_level("nonsense"), LevelFilter::Info);
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp();
        let millis = ts.split('.').nth(1).expect("millis part");
        assert_eq!(millis.len(), 3);
    }
}
