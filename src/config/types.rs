//! Configuration types.
//!
//! This module defines the worker configuration struct and the enums used for
//! logging configuration.

use clap::ValueEnum;

use super::constants::*;

/// Logging level for the worker.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl LogLevel {
    /// Parses a configured log level name.
    ///
    /// Accepts the names the orchestration side uses (`warning`, `fatal`) in
    /// addition to the conventional Rust ones.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" | "fatal" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Worker configuration.
///
/// Constructed from environment variables via [`Config::from_env`] or
/// programmatically. All duration-like fields are expressed in seconds and
/// validated against the ranges documented on each field.
#[derive(Debug, Clone)]
pub struct Config {
    /// Message broker connection string
    pub queue_connection_string: String,

    /// Name of the task queue to consume
    pub queue_name: String,

    /// Blob store root (connection string or local root directory)
    pub blob_connection_string: String,

    /// Blob container holding task inputs and outputs
    pub blob_container: String,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Queue receive poll interval in seconds (1-60)
    pub poll_interval_secs: u64,

    /// Per-attempt scanner timeout in seconds (30-7200)
    pub scanner_timeout_secs: u64,

    /// Interval between message lease renewals in seconds (10-300)
    pub lease_renewal_interval_secs: u64,

    /// Maximum total time to keep renewing a message lease in seconds (60-7200)
    pub max_lease_renewal_secs: u64,

    /// Whether to raise completion events to the orchestrator
    pub enable_orchestrator_notifications: bool,

    /// Orchestrator callback base URL (required when notifications are enabled)
    pub orchestrator_endpoint: String,

    /// Orchestrator callback auth code (required when notifications are enabled)
    pub orchestrator_key: String,

    /// Timeout for orchestrator callback requests in seconds
    pub notification_timeout_secs: u64,

    /// Whether to fire lifecycle step events to the chat webhook
    pub enable_step_notifications: bool,

    /// Chat webhook URL; step notifications are silently disabled when empty
    pub step_webhook_url: String,

    /// Timeout for step webhook requests in seconds
    pub step_webhook_timeout_secs: u64,

    /// Number of concurrent DNS resolution workers
    pub dns_worker_count: usize,

    /// DNS query rate limit in queries per second, shared across workers
    pub dns_rate_limit: u32,

    /// Shard count for the DNS result map
    pub dns_shard_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_connection_string: String::new(),
            queue_name: String::new(),
            blob_connection_string: String::new(),
            blob_container: String::new(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            scanner_timeout_secs: DEFAULT_SCANNER_TIMEOUT_SECS,
            lease_renewal_interval_secs: DEFAULT_LEASE_RENEWAL_INTERVAL_SECS,
            max_lease_renewal_secs: DEFAULT_MAX_LEASE_RENEWAL_SECS,
            enable_orchestrator_notifications: true,
            orchestrator_endpoint: String::new(),
            orchestrator_key: String::new(),
            notification_timeout_secs: DEFAULT_NOTIFICATION_TIMEOUT_SECS,
            enable_step_notifications: true,
            step_webhook_url: String::new(),
            step_webhook_timeout_secs: DEFAULT_STEP_WEBHOOK_TIMEOUT_SECS,
            dns_worker_count: DEFAULT_DNS_WORKER_COUNT,
            dns_rate_limit: DEFAULT_DNS_RATE_LIMIT,
            dns_shard_count: DEFAULT_DNS_SHARD_COUNT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_log_level_parse_aliases() {
        // The orchestration side configures "warning" and "fatal"
        assert!(matches!(LogLevel::parse("warning"), Some(LogLevel::Warn)));
        assert!(matches!(LogLevel::parse("fatal"), Some(LogLevel::Error)));
        assert!(matches!(LogLevel::parse("INFO"), Some(LogLevel::Info)));
        assert!(LogLevel::parse("verbose").is_none());
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.scanner_timeout_secs, 7200);
        assert_eq!(config.lease_renewal_interval_secs, 30);
        assert_eq!(config.max_lease_renewal_secs, 3600);
        assert_eq!(config.dns_worker_count, 50);
        assert_eq!(config.dns_rate_limit, 1000);
        assert_eq!(config.dns_shard_count, 16);
        assert!(config.enable_orchestrator_notifications);
        assert!(config.enable_step_notifications);
    }
}
