use crate::model::error::system::SystemError;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub struct Logging;

impl Logging {
    /// Installs the global subscriber: stdout plus a daily file under
    /// `log_directory`. Keep the guard alive or buffered lines are lost.
    pub fn initialize(log_directory: &Path) -> Result<WorkerGuard, SystemError> {
        let file_appender = tracing_appender::rolling::daily(log_directory, "backup-client.log");
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .with(fmt::layer().with_ansi(false).with_writer(file_writer))
            .try_init()
            .map_err(SystemError::LoggingInitFailed)?;

        log_panics::init();

        Ok(guard)
    }
}
