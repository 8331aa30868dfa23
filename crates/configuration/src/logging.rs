use crate::error::ConfigError;
use crate::settings::LoggingConfig;
use chrono::{DateTime, Local};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global tracing subscriber: stdout always, plus one log file per run.
///
/// The returned guard flushes the file writer on drop and must be held until exit.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    let (file_layer, guard) = if config.file_output {
        std::fs::create_dir_all(&config.log_dir)
            .map_err(|e| ConfigError::Logging(format!("{}: {}", config.log_dir.display(), e)))?;
        let appender = tracing_appender::rolling::never(
            &config.log_dir,
            run_log_file_name(&config.file_name, Local::now()),
        );
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
            .with_writer(writer);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    Ok(guard)
}

/// `<run timestamp>_<file name>`, so every run gets its own file.
fn run_log_file_name(file_name: &str, started_at: DateTime<Local>) -> String {
    format!("{}_{}", started_at.format("%m-%d-%Y_%H-%M-%S"), file_name)
}
