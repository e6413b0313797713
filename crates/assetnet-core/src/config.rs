//! Runtime settings
//!
//! Settings come from environment variables; command-line flags layered on
//! top by the binary take precedence.
//!
//! | variable                        | default |
//! |---------------------------------|---------|
//! | `ASSETNET_DB_PATH`              | unset (in-memory store) |
//! | `ASSETNET_WARRANTY_WINDOW_DAYS` | 30      |
//! | `ASSETNET_REVIEW_INTERVAL_DAYS` | 365     |
//! | `ASSETNET_LOG`                  | `info`  |
//!
//! Day counts must lie in `0..=MAX_DAYS`.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "ASSETNET_DB_PATH";
pub const ENV_WARRANTY_WINDOW_DAYS: &str = "ASSETNET_WARRANTY_WINDOW_DAYS";
pub const ENV_REVIEW_INTERVAL_DAYS: &str = "ASSETNET_REVIEW_INTERVAL_DAYS";
pub const ENV_LOG: &str = "ASSETNET_LOG";

/// Upper bound for any day-count setting (one hundred years)
pub const MAX_DAYS: i64 = 36_500;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable is set but cannot be used
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Settings shared by the store, the service and the reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// RocksDB directory; `None` keeps everything in memory
    pub db_path: Option<PathBuf>,
    /// Warranties ending within this many days are reported as expiring
    pub warranty_window_days: i64,
    /// Assets not reviewed within this many days are overdue
    pub review_interval_days: i64,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: None,
            warranty_window_days: 30,
            review_interval_days: 365,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup(ENV_DB_PATH)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let warranty_window_days = match lookup(ENV_WARRANTY_WINDOW_DAYS) {
            Some(v) => parse_days(ENV_WARRANTY_WINDOW_DAYS, &v)?,
            None => defaults.warranty_window_days,
        };

        let review_interval_days = match lookup(ENV_REVIEW_INTERVAL_DAYS) {
            Some(v) => parse_days(ENV_REVIEW_INTERVAL_DAYS, &v)?,
            None => defaults.review_interval_days,
        };

        let log_filter = lookup(ENV_LOG)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.log_filter);

        Ok(Self {
            db_path,
            warranty_window_days,
            review_interval_days,
            log_filter,
        })
    }
}

fn parse_days(name: &'static str, value: &str) -> Result<i64> {
    match value.trim().parse::<i64>() {
        Ok(days) if (0..=MAX_DAYS).contains(&days) => Ok(days),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}
