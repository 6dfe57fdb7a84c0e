use std::path::Path;

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, fmt::time::UtcTime, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::error::{AppError, AppResult};

/// Keeps the file writer flushing for the life of the process.
static FILE_WRITER_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

const DEFAULT_LOG_DIRECTIVES: &str = "info,app::progress=debug,app::db=info";
const LOG_FILE_PREFIX: &str = "numberland-progress.log";

/// Installs the global subscriber: a daily-rolling file under `log_dir` plus stdout.
/// Calling it again after a successful init is a no-op.
pub fn init_logging(log_dir: &Path) -> AppResult<()> {
    FILE_WRITER_GUARD
        .get_or_try_init(|| install_subscriber(log_dir))
        .map(|_| ())
}

fn install_subscriber(log_dir: &Path) -> AppResult<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX));

    // progress events are keyed by target, so the file keeps it and stdout drops it
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_timer(UtcTime::rfc_3339());
    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_timer(UtcTime::rfc_3339());

    tracing_subscriber::registry()
        .with(log_filter()?)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|err| AppError::other(format!("failed to install subscriber: {err}")))?;

    Ok(guard)
}

/// `RUST_LOG` wins; otherwise the progress targets get debug output.
fn log_filter() -> AppResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_DIRECTIVES))
        .map_err(|err| AppError::other(format!("failed to parse log directives: {err}")))
}
