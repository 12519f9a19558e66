//! Logging setup for the sync daemon and its CLI front end.
//!
//! This crate does not implement a logging framework of its own; it wraps
//! [`tracing`] and, when the `subscriber` feature is enabled, installs a
//! [`tracing_subscriber`] `fmt` layer configured from the `[Logging]`
//! section of the daemon's configuration (`logfile`, `loglevel`).
//!
//! Kept deliberately small: CLI plumbing and config-file parsing are out of
//! scope for this crate, which only turns an already-parsed [`LogLevel`] and
//! optional file path into an installed global subscriber.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Verbosity recognised by the `[Logging] loglevel` configuration key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LogLevel {
    /// Coarse, user-facing progress messages.
    Info,
    /// Per-event tracing used to diagnose reconciliation decisions.
    Debug,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        })
    }
}

/// Error returned when a `loglevel` string does not match a known variant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseLogLevelError(String);

impl fmt::Display for ParseLogLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized log level {:?}, expected INFO or DEBUG", self.0)
    }
}

impl std::error::Error for ParseLogLevelError {}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            other => Err(ParseLogLevelError(other.to_string())),
        }
    }
}

/// Destination for log output, mirroring the `[Logging]` config section.
#[derive(Clone, Debug, Default)]
pub struct LoggingConfig {
    /// Path to a logfile; `None` logs to stderr.
    pub logfile: Option<PathBuf>,
    /// Verbosity; defaults to [`LogLevel::Info`].
    pub level: Option<LogLevel>,
}

/// Installs the process-wide [`tracing`] subscriber.
///
/// Safe to call at most once per process; a second call is a no-op rather
/// than a panic, since daemon restarts within the same process (tests, or a
/// `Draining -> Idle -> Running` cycle) must not crash on re-init.
#[cfg(feature = "subscriber")]
pub fn init(config: &LoggingConfig) {
    use std::sync::Once;
    use tracing_subscriber::EnvFilter;

    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let level = config.level.unwrap_or(LogLevel::Info);
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

        let builder = tracing_subscriber::fmt().with_env_filter(filter);

        let installed = if let Some(path) = &config.logfile {
            match std::fs::OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => builder.with_writer(move || file.try_clone().expect("clone logfile handle")).try_init(),
                Err(_) => builder.try_init(),
            }
        } else {
            builder.try_init()
        };

        // A prior subscriber (e.g. installed by a test harness) is fine to leave in place.
        let _ = installed;
    });
}
