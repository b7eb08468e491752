//! Log to stdout and to a daily file `{logs_dir}/YYYY-MM-DD.log`

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{BotError, Result};
use crate::settings::Settings;

/// Keep the guard alive for the whole run or buffered lines are lost
pub fn init(settings: &Settings) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&settings.logs_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_suffix("log")
        .build(&settings.logs_dir)
        .map_err(|e| BotError::Logging(e.to_string()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.log_level));

    Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| BotError::Logging(e.to_string()))?;

    Ok(guard)
}
