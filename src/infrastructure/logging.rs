use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::domain::config::LoggingConfig;
use crate::domain::DomainError;

const LOG_TARGET: &str = "groq_playground";
const LOG_FILE_PREFIX: &str = "playground.log";

/// Install the global subscriber: console output always, plus a daily
/// rolling JSON file when enabled.
///
/// The returned guard flushes the file writer on drop and must live as long
/// as the application. Installing twice is harmless; the second call only
/// reports.
pub fn init_logging(
    logs_dir: &Path,
    config: &LoggingConfig,
) -> Result<Option<WorkerGuard>, DomainError> {
    let level = config.level.as_str();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={},warn", LOG_TARGET, level)));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NONE)
        .with_filter(env_filter);

    if !config.file_logging {
        let _ = tracing_subscriber::registry()
            .with(console_layer)
            .try_init();

        tracing::info!(level, "Logging initialized (console only)");
        return Ok(None);
    }

    fs::create_dir_all(logs_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(config.max_files.max(1) as usize)
        .build(logs_dir)
        .map_err(|e| DomainError::Config(format!("Failed to create log file appender: {}", e)))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(EnvFilter::new(format!("{}={}", LOG_TARGET, level)));

    if tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
    {
        tracing::info!(
            logs_dir = ?logs_dir,
            level,
            max_files = config.max_files,
            "Logging initialized with file output"
        );
    }

    Ok(Some(guard))
}
