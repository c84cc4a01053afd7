// ── Safety policy ────────────────────────────────────────────────────────────
// Unsafe code is forbidden everywhere except `platform::win32` (Win32 and
// WebView2 FFI).  Each unsafe block there MUST carry a `// SAFETY:` comment.
#![deny(unsafe_code)]
// Release builds run as a GUI application (no console window).
// Debug builds keep the console so that log output is visible.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
// Only the platform-independent core (and its tests) is built elsewhere.
#![cfg_attr(not(windows), allow(dead_code))]

mod catalog;
mod config;
mod document;
mod editor;
mod error;
mod keymap;
mod platform;
mod settings;
mod shell;

use config::Config;

fn main() {
    let config = Config::from_env();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .format_timestamp_millis()
        .init();
    log::debug!("starting with {config:?}");

    run(config);
}

#[cfg(windows)]
fn run(config: Config) {
    if let Err(e) = platform::win32::window::run(config) {
        // Startup failed before or during the message loop.
        // A modal dialog is the only reliable output path in a GUI app.
        log::error!("{e}");
        platform::win32::window::show_error_dialog(&e.to_string());
        std::process::exit(1);
    }
}

#[cfg(not(windows))]
fn run(_config: Config) {
    log::error!("Mirror IDE needs Windows and the WebView2 runtime");
    std::process::exit(1);
}
