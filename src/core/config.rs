//! # Configuration
//!
//! Runtime settings loaded from the environment (after `.env` is applied by the binary).
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::{anyhow, Result};
use std::time::Duration;

/// Default sqlite file for reminder storage
pub const DEFAULT_DATABASE_PATH: &str = "reminders.db";

/// Seconds between two due-checks
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;

/// Longest a single sink may take before the attempt counts as failed
pub const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_NOTIFY_COMMAND: &str = "notify-send";
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Reminder";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: String,
    pub check_interval: Duration,
    pub delivery_timeout: Duration,
    pub notify_command: String,
    pub notification_title: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            delivery_timeout: Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECS),
            notify_command: DEFAULT_NOTIFY_COMMAND.to_string(),
            notification_title: DEFAULT_NOTIFICATION_TITLE.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let check_interval = match lookup("REMINDER_CHECK_INTERVAL_SECS") {
            Some(raw) => Duration::from_secs(parse_positive_secs("REMINDER_CHECK_INTERVAL_SECS", &raw)?),
            None => defaults.check_interval,
        };
        let delivery_timeout = match lookup("REMINDER_DELIVERY_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_positive_secs("REMINDER_DELIVERY_TIMEOUT_SECS", &raw)?),
            None => defaults.delivery_timeout,
        };

        Ok(Config {
            database_path: lookup("REMINDER_DATABASE_PATH").unwrap_or(defaults.database_path),
            check_interval,
            delivery_timeout,
            notify_command: lookup("REMINDER_NOTIFY_COMMAND").unwrap_or(defaults.notify_command),
            notification_title: lookup("REMINDER_NOTIFICATION_TITLE")
                .unwrap_or(defaults.notification_title),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }
}

fn parse_positive_secs(key: &str, raw: &str) -> Result<u64> {
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|e| anyhow!("{} must be a whole number of seconds, got '{}': {}", key, raw, e))?;
    if value == 0 {
        return Err(anyhow!("{} must be greater than zero", key));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert_eq!(config.database_path, "reminders.db");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("REMINDER_DATABASE_PATH", "/tmp/r.db"),
            ("REMINDER_CHECK_INTERVAL_SECS", "5"),
            ("REMINDER_DELIVERY_TIMEOUT_SECS", " 3 "),
            ("REMINDER_NOTIFICATION_TITLE", "Heads up"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, "/tmp/r.db");
        assert_eq!(config.check_interval, Duration::from_secs(5));
        assert_eq!(config.delivery_timeout, Duration::from_secs(3));
        assert_eq!(config.notification_title, "Heads up");
        assert_eq!(config.notify_command, "notify-send");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_rejects_bad_interval() {
        assert!(Config::from_lookup(lookup_from(&[("REMINDER_CHECK_INTERVAL_SECS", "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("REMINDER_CHECK_INTERVAL_SECS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("REMINDER_DELIVERY_TIMEOUT_SECS", "-1")])).is_err());
    }
}
