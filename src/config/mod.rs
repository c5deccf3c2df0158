//! Worker configuration.
//!
//! Configuration is environment-driven: [`Config::from_env`] reads the
//! recognized variables, applies defaults, and [`Config::validate`] enforces
//! the documented ranges before the worker starts. Range violations abort
//! startup with a configuration error.

pub mod constants;
mod types;

use std::env;

pub use constants::*;
pub use types::{Config, LogFormat, LogLevel};

use crate::error_handling::AppError;

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Missing optional variables fall back to their defaults; the result is
    /// validated before being returned.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a value is malformed or outside its
    /// valid range.
    pub fn from_env() -> Result<Self, AppError> {
        let config = Self {
            queue_connection_string: get_env("QUEUE_CONNECTION_STRING", ""),
            queue_name: get_env("QUEUE_NAME", "scan-tasks"),
            blob_connection_string: get_env("BLOB_CONNECTION_STRING", ""),
            blob_container: get_env("BLOB_CONTAINER", "scans"),
            log_level: LogLevel::parse(&get_env("LOG_LEVEL", "info")).ok_or_else(|| {
                AppError::configuration("LOG_LEVEL", "invalid log level; valid levels are: debug, info, warning, warn, error, fatal")
            })?,
            log_format: LogFormat::Plain,
            poll_interval_secs: get_env_u64("POLL_INTERVAL", DEFAULT_POLL_INTERVAL_SECS)?,
            scanner_timeout_secs: get_env_u64("SCANNER_TIMEOUT", DEFAULT_SCANNER_TIMEOUT_SECS)?,
            lease_renewal_interval_secs: get_env_u64(
                "LEASE_RENEWAL_INTERVAL",
                DEFAULT_LEASE_RENEWAL_INTERVAL_SECS,
            )?,
            max_lease_renewal_secs: get_env_u64(
                "MAX_LEASE_RENEWAL_TIME",
                DEFAULT_MAX_LEASE_RENEWAL_SECS,
            )?,
            enable_orchestrator_notifications: get_env_bool("ENABLE_NOTIFICATIONS", true),
            orchestrator_endpoint: get_env("DURABLE_API_ENDPOINT", ""),
            orchestrator_key: get_env("DURABLE_API_KEY", ""),
            notification_timeout_secs: get_env_u64(
                "NOTIFICATION_TIMEOUT",
                DEFAULT_NOTIFICATION_TIMEOUT_SECS,
            )?,
            enable_step_notifications: get_env_bool("ENABLE_STEP_NOTIFICATIONS", true),
            step_webhook_url: get_env("STEP_WEBHOOK_URL", ""),
            step_webhook_timeout_secs: get_env_u64(
                "STEP_WEBHOOK_TIMEOUT",
                DEFAULT_STEP_WEBHOOK_TIMEOUT_SECS,
            )?,
            dns_worker_count: get_env_u64("DNS_WORKER_COUNT", DEFAULT_DNS_WORKER_COUNT as u64)?
                as usize,
            dns_rate_limit: get_env_u64("DNS_RATE_LIMIT", DEFAULT_DNS_RATE_LIMIT as u64)? as u32,
            dns_shard_count: get_env_u64("DNS_SHARD_COUNT", DEFAULT_DNS_SHARD_COUNT as u64)?
                as usize,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks that all configured values are within their valid ranges.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending field.
    pub fn validate(&self) -> Result<(), AppError> {
        validate_range(
            "SCANNER_TIMEOUT",
            self.scanner_timeout_secs,
            30,
            7200,
            "Scanner timeout",
        )?;
        validate_range(
            "POLL_INTERVAL",
            self.poll_interval_secs,
            1,
            60,
            "Poll interval",
        )?;
        validate_range(
            "LEASE_RENEWAL_INTERVAL",
            self.lease_renewal_interval_secs,
            10,
            300,
            "Lease renewal interval",
        )?;
        validate_range(
            "MAX_LEASE_RENEWAL_TIME",
            self.max_lease_renewal_secs,
            60,
            7200,
            "Max lease renewal time",
        )?;

        if self.dns_worker_count == 0 {
            return Err(AppError::configuration(
                "DNS_WORKER_COUNT",
                "DNS worker count must be at least 1",
            ));
        }
        if self.dns_rate_limit == 0 {
            return Err(AppError::configuration(
                "DNS_RATE_LIMIT",
                "DNS rate limit must be at least 1 query per second",
            ));
        }
        if self.dns_shard_count == 0 {
            return Err(AppError::configuration(
                "DNS_SHARD_COUNT",
                "DNS shard count must be at least 1",
            ));
        }

        if self.enable_orchestrator_notifications
            && (self.orchestrator_endpoint.is_empty() || self.orchestrator_key.is_empty())
        {
            return Err(AppError::configuration(
                "DURABLE_API_ENDPOINT",
                "orchestrator notifications are enabled but DURABLE_API_ENDPOINT or DURABLE_API_KEY is not set",
            ));
        }

        Ok(())
    }
}

fn validate_range(
    field: &str,
    value: u64,
    min: u64,
    max: u64,
    name: &str,
) -> Result<(), AppError> {
    if value < min || value > max {
        return Err(AppError::configuration(
            field,
            format!("{name} must be between {min} and {max} seconds"),
        ));
    }
    Ok(())
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_u64(key: &str, default: u64) -> Result<u64, AppError> {
    match env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|_| AppError::configuration(key, format!("expected an integer, got '{value}'"))),
        Err(_) => Ok(default),
    }
}

fn get_env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            enable_orchestrator_notifications: false,
            ..Config::default()
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_poll_interval_range() {
        let mut config = valid_config();
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());
        config.poll_interval_secs = 61;
        assert!(config.validate().is_err());
        config.poll_interval_secs = 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_scanner_timeout_range() {
        let mut config = valid_config();
        config.scanner_timeout_secs = 29;
        assert!(config.validate().is_err());
        config.scanner_timeout_secs = 7201;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_lease_renewal_ranges() {
        let mut config = valid_config();
        config.lease_renewal_interval_secs = 9;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.max_lease_renewal_secs = 59;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_dns_knobs() {
        let mut config = valid_config();
        config.dns_worker_count = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.dns_rate_limit = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.dns_shard_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_notification_wiring() {
        let mut config = Config::default();
        config.enable_orchestrator_notifications = true;
        config.orchestrator_endpoint = String::new();
        assert!(config.validate().is_err());

        config.orchestrator_endpoint = "https://funcs.example.net/runtime/webhooks/durabletask".into();
        config.orchestrator_key = "key".into();
        assert!(config.validate().is_ok());
    }
}
