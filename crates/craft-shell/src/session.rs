//! Session context.
//!
//! Process-lifetime state shared across commands: the current cluster and
//! the debug/verbose toggles. The effective [`LogLevel`] is derived from the
//! toggles with precedence `Debug > Verbose > Error` and pushed to every
//! [`LogLevelSink`] after each toggle.

use std::fmt;

use tracing::debug;

/// Effective log level derived from the session toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Informational output.
    Verbose,
    /// Everything.
    Debug,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
        })
    }
}

/// Anything that can be told the current log level.
///
/// Implementations must tolerate the same level being applied repeatedly.
pub trait LogLevelSink {
    /// Apply `level`.
    fn set_log_level(&self, level: LogLevel);
}

/// Mutable per-process shell state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    current_cluster: String,
    verbose: bool,
    debug: bool,
}

impl Session {
    /// A session pointed at `default_cluster` with both toggles off.
    pub fn new(default_cluster: impl Into<String>) -> Self {
        Self {
            current_cluster: default_cluster.into(),
            verbose: false,
            debug: false,
        }
    }

    /// Start with the given toggles, e.g. from command-line flags.
    #[must_use]
    pub const fn with_toggles(mut self, verbose: bool, debug: bool) -> Self {
        self.verbose = verbose;
        self.debug = debug;
        self
    }

    /// The cluster commands default to.
    pub fn current_cluster(&self) -> &str {
        &self.current_cluster
    }

    /// Whether verbose mode is on.
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Whether debug mode is on.
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Level implied by the toggles.
    pub const fn effective_level(&self) -> LogLevel {
        if self.debug {
            LogLevel::Debug
        } else if self.verbose {
            LogLevel::Verbose
        } else {
            LogLevel::Error
        }
    }

    /// Flip debug mode; returns the new setting.
    pub fn toggle_debug(&mut self) -> bool {
        self.debug = !self.debug;
        self.debug
    }

    /// Flip verbose mode; returns the new setting.
    pub fn toggle_verbose(&mut self) -> bool {
        self.verbose = !self.verbose;
        self.verbose
    }

    /// Push the effective level to every sink.
    pub fn propagate_level(&self, sinks: &[&dyn LogLevelSink]) -> LogLevel {
        let level = self.effective_level();
        debug!(%level, sinks = sinks.len(), "propagating log level");
        for sink in sinks {
            sink.set_log_level(level);
        }
        level
    }

    /// Only the cluster-switch hook calls this, after the inventory has
    /// confirmed the cluster exists.
    pub(crate) fn set_current_cluster(&mut self, cluster: &str) {
        cluster.clone_into(&mut self.current_cluster);
    }
}
