//! Connection configuration.
//!
//! A [`Connector`](crate::db::Connector) is configured by applying a list of
//! [`ConnectOption`]s, in order, on top of [`Config::default`]. Options that
//! fail validation abort the connect.

use std::path::PathBuf;
use std::time::Duration;

use crate::db::LogLevel;
use crate::db::reserve::Reserve;
use crate::error::{DbError, DbResult};

// Pool configuration defaults
pub const DEFAULT_POOL_SIZE: u32 = 10;
pub const MIN_POOL_SIZE: u32 = 2;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// A single connect-time setting.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOption {
    /// Maximum connections in the pool; values below 2 are raised to 2.
    PoolSize(u32),
    /// Threshold for forwarded driver events.
    LogLevel(LogLevel),
    /// Directory for failure reservation dumps; an empty path disables them.
    ReservePath(PathBuf),
    /// How long to wait for a free pooled connection, in seconds.
    AcquireTimeout(u64),
    /// How long an unused pooled connection is kept open, in seconds.
    IdleTimeout(u64),
}

impl ConnectOption {
    /// Apply this option to `config`.
    ///
    /// A reservation path is checked on disk, so applying is async.
    pub async fn apply(&self, config: &mut Config) -> DbResult<()> {
        match self {
            Self::PoolSize(size) => config.pool_size = Some((*size).max(MIN_POOL_SIZE)),
            Self::LogLevel(level) => config.log_level = *level,
            Self::ReservePath(path) => config.reserve = Reserve::open(path).await?,
            Self::AcquireTimeout(secs) => config.acquire_timeout_secs = Some(*secs),
            Self::IdleTimeout(secs) => config.idle_timeout_secs = Some(*secs),
        }
        config.validate()
    }
}

/// Resolved connection configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    /// Maximum connections in pool (default: 10)
    pub pool_size: Option<u32>,
    /// Default: none, driver events are not forwarded
    pub log_level: LogLevel,
    /// Reservation directory, if enabled
    pub reserve: Option<Reserve>,
    /// Acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Idle timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
}

impl Config {
    /// Build a configuration from an ordered option list.
    pub async fn from_options(options: &[ConnectOption]) -> DbResult<Self> {
        let mut config = Self::default();
        for option in options {
            option.apply(&mut config).await?;
        }
        Ok(config)
    }

    /// Get pool_size with default value.
    pub fn pool_size_or_default(&self) -> u32 {
        self.pool_size.unwrap_or(DEFAULT_POOL_SIZE)
    }

    /// Get acquire_timeout with default value.
    pub fn acquire_timeout_or_default(&self) -> Duration {
        Duration::from_secs(
            self.acquire_timeout_secs
                .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        )
    }

    /// Get idle_timeout with default value.
    pub fn idle_timeout_or_default(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.acquire_timeout_secs == Some(0) {
            return Err(DbError::config("acquire_timeout must be greater than 0"));
        }
        if self.idle_timeout_secs == Some(0) {
            return Err(DbError::config("idle_timeout must be greater than 0"));
        }
        Ok(())
    }
}
