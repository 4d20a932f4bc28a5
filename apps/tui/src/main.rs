//! DocChat TUI: a terminal chat window over a Google Drive folder.
//!
//! The UI runs on the main thread with `ratatui` + `crossterm`; the chat
//! session lives on a tokio runtime and talks to it over channels.

mod app;
mod screens;
mod widgets;
mod worker;

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use color_eyre::eyre::Result;
use docchat_shared::{ErrorMessages, config_dir, load_config};
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;

/// Log file inside the config directory; the terminal belongs to the UI.
const LOG_FILE: &str = "docchat-tui.log";

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    init_tracing();

    let config_path = std::env::var_os("DOCCHAT_CONFIG").map(PathBuf::from);
    let secrets_path = std::env::var_os("DOCCHAT_SECRETS").map(PathBuf::from);

    let config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("  ✗ {}", ErrorMessages::builtin().for_error(&err));
            return Ok(ExitCode::FAILURE);
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let (request_tx, request_rx) = unbounded_channel();
    let (event_tx, event_rx) = unbounded_channel();
    runtime.spawn(worker::run(config.clone(), secrets_path, request_rx, event_tx));

    info!(title = %config.app.title, "tui started");
    app::run(&config.app, request_tx, event_rx)?;

    // Drop any in-flight request instead of waiting on it.
    runtime.shutdown_background();
    Ok(ExitCode::SUCCESS)
}

/// Write logs to a file; skipped silently when it cannot be opened.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let Some(file) = config_dir()
        .ok()
        .and_then(|dir| std::fs::create_dir_all(&dir).ok().map(|_| dir.join(LOG_FILE)))
        .and_then(|path| File::create(path).ok())
    else {
        return;
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docchat=info"));

    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
}
