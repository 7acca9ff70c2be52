//! Logging setup.
//!
//! The terminal belongs to the table view, so log output goes to a daily
//! rotating file. `RUST_LOG` overrides the default filter.

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Default log level if RUST_LOG is not set.
const DEFAULT_LOG_FILTER: &str = "lazytable=info,warn";

/// Same filter with debug output for the crate, used by `--verbose`.
const VERBOSE_LOG_FILTER: &str = "lazytable=debug,warn";

const LOG_FILE_PREFIX: &str = "lazytable.log";

/// Initialize the logging system.
///
/// Logs go to `dir` when given, otherwise to the platform local data
/// directory, e.g. `~/.local/share/lazytable/logs/` on Linux.
///
/// # Errors
///
/// Returns an error if the log directory cannot be determined or created,
/// or if a global subscriber is already set.
pub fn init(dir: Option<&Path>, verbose: bool) -> anyhow::Result<PathBuf> {
    let log_dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => get_log_directory()?,
    };
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    let default_filter = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter);

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "LazyTable starting up");
    tracing::debug!(log_dir = %log_dir.display(), "Log directory");

    Ok(log_dir)
}

fn get_log_directory() -> anyhow::Result<PathBuf> {
    let base_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine local data directory"))?;

    Ok(base_dir.join("lazytable").join("logs"))
}

/// Where logs are written by default, for the info dialog.
pub fn log_directory() -> Option<PathBuf> {
    get_log_directory().ok()
}

/// Log application shutdown.
pub fn shutdown() {
    tracing::info!("LazyTable shutting down");
}
