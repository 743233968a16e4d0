#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use runtime_thunk::app::dialog::NativeDialogService;
use runtime_thunk::app::launcher;
use runtime_thunk::config::AppConfig;
use tracing_subscriber::EnvFilter;

fn main() {
    // Diagnostics go to stderr so they never mix with the script's stdout.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        AppConfig::default()
    });

    let code = launcher::run(&config, &NativeDialogService);
    std::process::exit(code);
}
