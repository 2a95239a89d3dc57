//! Tracing setup.
//!
//! Logs go to stderr through an [`EnvFilter`] wrapped in a reload layer.
//! [`LogHandle`] implements [`LogLevelSink`], so the `debug` and `verbose`
//! toggles change the live filter.

use std::io;

use craft_shell::{LogLevel, LogLevelSink};
use tracing::warn;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

use crate::error::CliError;

/// Filter directive for a session log level.
pub const fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Verbose => "info",
        LogLevel::Debug => "debug",
    }
}

/// Handle on the installed filter.
#[derive(Debug, Clone)]
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

/// Install the global subscriber at `level`. `RUST_LOG`, when set, wins
/// until the first toggle.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(level: LogLevel) -> Result<LogHandle, CliError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(level)));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))?;

    Ok(LogHandle { handle })
}

impl LogLevelSink for LogHandle {
    fn set_log_level(&self, level: LogLevel) {
        if let Err(e) = self.handle.reload(EnvFilter::new(directive(level))) {
            warn!(error = %e, "could not change log level");
        }
    }
}
