use anyhow::{Context, Result};
use convaudio_engine::UiMode;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// The full-screen view owns the terminal, so interactive runs only log when a
/// log file is configured. Plain runs log warnings and errors to stderr.
/// `RUST_LOG` overrides the default level either way.
pub fn init_logging(mode: UiMode, log_file: Option<&Path>) -> Result<()> {
    match (mode, log_file) {
        (_, Some(path)) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(filter("info"))
                .with_writer(Mutex::new(file))
                .with_target(false)
                .with_ansi(false)
                .init();
        }
        (UiMode::Plain, None) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter("warn"))
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .init();
        }
        (UiMode::Interactive, None) => {}
    }
    Ok(())
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
