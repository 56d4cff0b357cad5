// Logging configuration using tracing.
// Log lines go to a file under the platform cache directory so the
// terminal stays clean while the alternate screen is active.

use std::path::PathBuf;

use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{QuillError, Result};

/// Directory that holds the log file (~/.cache/quill on macOS/Linux).
fn log_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "quill").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Initialize the tracing subscriber.
///
/// Filtering comes from the RUST_LOG environment variable, defaulting to
/// "quill=info". Returns a guard that must stay alive for the duration of
/// the program, otherwise buffered log lines are dropped. Returns None
/// when no cache directory can be resolved for this platform.
pub fn init() -> Result<Option<WorkerGuard>> {
    let Some(dir) = log_dir() else {
        return Ok(None);
    };
    std::fs::create_dir_all(&dir)?;

    let file_appender = tracing_appender::rolling::never(&dir, "quill.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quill=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|e| QuillError::Other(format!("Failed to initialize tracing: {}", e)))?;

    Ok(Some(guard))
}
