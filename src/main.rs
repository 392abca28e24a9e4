// Hide console window on Windows release builds
#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use anyhow::Result;
use autochanger::app::AutochangerApp;
use autochanger_config::Settings;

fn main() -> Result<()> {
    // Initialize unified logging: routes all log::info!() etc. to the
    // session log file in the temp directory. When RUST_LOG is set, also
    // mirrors to stderr for terminal debugging.
    autochanger::debug::init_log_bridge();

    log::info!("Starting autochanger v{}", autochanger::VERSION);

    // Settings are loaded once here and owned by the app; components receive
    // them by reference instead of going through process-wide globals.
    let (settings, settings_path) = Settings::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Stormworks Lua Script Replacer")
            .with_inner_size([1000.0, 700.0])
            .with_min_inner_size([760.0, 520.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        "autochanger",
        options,
        Box::new(move |cc| Ok(Box::new(AutochangerApp::new(cc, settings, settings_path)))),
    );

    log::info!("Event loop exited");
    result.map_err(|e| anyhow::anyhow!("event loop error: {e}"))
}
