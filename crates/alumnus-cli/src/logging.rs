//! Tracing subscriber setup: console plus a daily rolling log file.

use crate::config::{LoggingConfig, Verbosity};
use crate::error::{CliError, CliResult};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file prefix; files are named `alumnus.YYYY-MM-DD.log`
const LOG_PREFIX: &str = "alumnus";

/// Filter directive: `RUST_LOG` wins, then the -v/-q flags, then the config
#[must_use]
pub fn filter_directive(config: &LoggingConfig, verbosity: Verbosity) -> String {
    std::env::var("RUST_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| verbosity.log_filter().map(str::to_string))
        .unwrap_or_else(|| config.level.clone())
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for
/// the whole run.
pub fn init_logging(config: &LoggingConfig, verbosity: Verbosity) -> CliResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(filter_directive(config, verbosity))
        .map_err(|e| CliError::config(format!("invalid log filter: {e}")))?;

    let console = config.console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let (file, guard) = if config.file {
        std::fs::create_dir_all(&config.dir)?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_PREFIX)
            .filename_suffix("log")
            .build(&config.dir)
            .map_err(|e| CliError::config(format!("cannot open log file: {e}")))?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| CliError::config(format!("logging already initialised: {e}")))?;

    Ok(guard)
}
