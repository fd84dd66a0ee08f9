//! Tracing setup
//!
//! Events go to two places: stderr (warnings and errors, everything with
//! `--debug`) and a plain-text log file that is appended to across runs.
//! `RUST_LOG` replaces the default filter when set.

use std::fs::{File, OpenOptions};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(debug: bool) -> String {
    let level = if debug { "debug" } else { "info" };
    format!("azmanage={level},azm={level}")
}

pub fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. A log file that cannot be opened is reported and skipped.
///
/// File writes happen on a background worker; keep the returned guard alive
/// until exit so buffered lines are flushed.
pub fn init_logging(debug: bool, log_file: &Path) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    let stderr_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_level);

    let (file_layer, guard, file_error) = match open_log_file(log_file) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if let (Ok(()), Some(e)) = (installed, file_error) {
        tracing::warn!("Could not open log file {}: {}", log_file.display(), e);
    }

    guard
}
