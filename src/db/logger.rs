//! Driver event logging.
//!
//! Connectors emit one event per statement round trip (cook, exec, query) and
//! per transaction end. [`DriverLog`] filters those events by the configured
//! [`LogLevel`] and forwards the survivors to `tracing`, so they land in
//! whatever subscriber the application installed.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, error, info, trace, warn};

use crate::error::DbError;

/// Severity threshold for driver events. `None` silences them entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    #[default]
    None,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Whether an event at `event` passes this threshold.
    pub fn admits(self, event: LogLevel) -> bool {
        event != LogLevel::None && event <= self
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(DbError::config(format!("unknown log level: {other}"))),
        }
    }
}

/// Level-filtered sink for driver events.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverLog {
    level: LogLevel,
}

impl DriverLog {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Forward a statement event; `rows` is the affected or returned row count.
    pub fn statement(&self, event: LogLevel, message: &str, dealer: &str, sql: &str, rows: u64) {
        if self.level.admits(event) {
            forward(event, message, dealer, sql, rows);
        }
    }

    /// Forward a failed statement.
    pub fn failure(&self, message: &str, dealer: &str, sql: &str, err: &DbError) {
        if self.level.admits(LogLevel::Error) {
            error!(dealer, sql, error = %err, "{message}");
        }
    }
}

/// Emit one driver event as a `tracing` event at the matching level.
///
/// Only `LogLevel::None` is dropped; threshold filtering belongs to [`DriverLog`].
pub fn forward(level: LogLevel, message: &str, dealer: &str, sql: &str, rows: u64) {
    match level {
        LogLevel::None => {}
        LogLevel::Error => error!(dealer, sql, rows, "{message}"),
        LogLevel::Warn => warn!(dealer, sql, rows, "{message}"),
        LogLevel::Info => info!(dealer, sql, rows, "{message}"),
        LogLevel::Debug => debug!(dealer, sql, rows, "{message}"),
        LogLevel::Trace => trace!(dealer, sql, rows, "{message}"),
    }
}
