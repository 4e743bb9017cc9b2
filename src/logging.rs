//! Tracing setup for the `dispatch` binary.
//!
//! stdout carries dispatch results only, so logs go to stderr unless a log
//! file is requested.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// `bot-dispatch/dispatch.log` under the platform state directory,
    /// truncated on each run.
    File,
}

/// Installs the global subscriber. `RUST_LOG` overrides the `info` default.
///
/// If the log file cannot be opened, logs fall back to stderr.
pub fn init(target: LogTarget) {
    let builder = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );

    let opened = match target {
        LogTarget::Stderr => None,
        LogTarget::File => Some(open_log_file()),
    };

    match opened {
        Some(Ok(file)) => builder.with_writer(Mutex::new(file)).with_ansi(false).init(),
        Some(Err(e)) => {
            builder.with_writer(std::io::stderr).init();
            tracing::warn!(error = %e, "Could not open log file, logging to stderr");
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
}

fn open_log_file() -> std::io::Result<File> {
    let path = log_path().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no state or config directory")
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    File::create(path)
}

fn log_path() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .map(|dir| dir.join("bot-dispatch").join("dispatch.log"))
}
