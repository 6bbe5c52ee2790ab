use std::env;
use std::path::Path;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_ENV: &str = "WIKIPATH_LOG";
const LOG_FILE: &str = "wikipath.log";

/// Route tracing output to `<dir>/wikipath.log`.
///
/// Nothing is written to the terminal: the TUI owns it, and headless modes
/// keep stdout for results. The filter comes from `WIKIPATH_LOG` and
/// defaults to `info`. Keep the returned guard alive until exit so the
/// background writer flushes.
pub fn init_logger(dir: &Path) -> Option<WorkerGuard> {
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));

    if std::fs::create_dir_all(dir).is_err() {
        return None;
    }
    let file_appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter_layer)
        .try_init();
    if installed.is_err() {
        return None;
    }

    debug!(filter = %filter, "logging to {}", dir.join(LOG_FILE).display());
    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs");
        let _guard = init_logger(&nested);
        assert!(nested.is_dir());
    }
}
