//! Logging setup: size-based rotation, a human-greppable startup marker
//! written before tracing initializes, and non-blocking file output. One
//! log file per service name under the runtime directory.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::env;

/// A human-greppable marker line written before tracing initializes, so a
/// client that failed to connect during spawn can scrape the log file
/// directly for a startup failure even if the subscriber never flushed.
pub const STARTUP_MARKER_PREFIX: &str = "--- loopbackd: starting (pid: ";

/// Rotate the log file if it has grown past the configured threshold,
/// keeping a bounded number of `.1`, `.2`, ... backups. Best-effort: any I/O
/// failure here is not allowed to stop the daemon from starting.
pub fn rotate_log_if_needed(log_path: &Path) {
    let max_bytes = env::log_max_bytes();
    let rotations = env::log_rotations();

    let size = match std::fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(_) => return,
    };
    if size < max_bytes {
        return;
    }

    for index in (1..rotations).rev() {
        let from = log_path.with_extension(format!("log.{index}"));
        let to = log_path.with_extension(format!("log.{}", index + 1));
        let _ = std::fs::rename(from, to);
    }
    let _ = std::fs::rename(log_path, log_path.with_extension("log.1"));
}

pub fn write_startup_marker(log_path: &Path, pid: u32) -> std::io::Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(log_path)?;
    writeln!(file, "{STARTUP_MARKER_PREFIX}{pid}) ---")
}

pub fn write_startup_error(log_path: &Path, error: &dyn std::error::Error) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
        let _ = writeln!(file, "--- loopbackd: startup failed: {error:#} ---");
    }
}

/// Initialize `tracing` with an `EnvFilter` (default `"info"`, overridable
/// via `LOOPBACK_LOG`) writing to a non-blocking appender over `log_path`.
/// The returned [`WorkerGuard`] must be held for the lifetime of the process
/// so buffered log lines flush before exit.
pub fn setup_logging(log_path: &Path) -> std::io::Result<WorkerGuard> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "daemon.log".into());
    let directory = log_path.parent().unwrap_or_else(|| Path::new("."));

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(env::log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
