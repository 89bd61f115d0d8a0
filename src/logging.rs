use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Set up tracing with a stdout layer and, when a log folder is configured,
/// a daily-rolling file layer. The returned guard must stay alive for the
/// duration of the process so buffered file output gets flushed.
pub fn init(log_folder: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let mut file_layer = None;
    let mut guard = None;
    if let Some(folder) = log_folder {
        let _ = fs::create_dir_all(folder);
        let appender = tracing_appender::rolling::daily(folder, "shelf-life.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(appender);
        file_layer = Some(fmt::layer().with_writer(non_blocking).with_ansi(false));
        guard = Some(worker_guard);
    }

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_file(false)
                .with_target(false)
                .with_ansi(true),
        )
        .with(file_layer)
        .with(filter)
        .init();

    guard
}
