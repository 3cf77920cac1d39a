//! Logging and tracing initialization.

use std::sync::Mutex;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// When `config.file` is set, log lines are appended to that file instead of
/// stderr. A file that cannot be opened falls back to stderr.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file = config.file.as_ref().and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Failed to open log file {}: {e}", path.display()))
            .ok()
    });

    match (config.json, file) {
        (true, Some(file)) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(Mutex::new(file))
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (true, None) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (false, Some(file)) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (false, None) => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
    }
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
