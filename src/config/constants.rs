//! Configuration constants.
//!
//! This module defines all configuration constants used throughout the worker,
//! including timeouts, limits, and other operational parameters.

use std::time::Duration;

// Message processing
/// Default queue poll interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
/// Minimum receive wait: short poll intervals still keep the receive call
/// open long enough to avoid hammering the broker
pub const RECEIVE_WAIT_FLOOR: Duration = Duration::from_secs(30);
/// Pause between main-loop iterations to avoid busy-looping on an empty queue
pub const IDLE_PAUSE: Duration = Duration::from_millis(100);

// Retry strategy for task processing
/// Maximum number of in-process attempts per received message
pub const RETRY_MAX_ATTEMPTS: u32 = 3;
/// Base delay before the first retry; doubles with each attempt
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

// Scanner execution
/// Default per-attempt scanner timeout in seconds (2 hours; nuclei scans over
/// large host sets routinely run into the tens of minutes)
pub const DEFAULT_SCANNER_TIMEOUT_SECS: u64 = 7200;

// Lease renewal
/// Default interval between lease renewals in seconds
pub const DEFAULT_LEASE_RENEWAL_INTERVAL_SECS: u64 = 30;
/// Default upper bound on how long a single message may keep its lease alive
pub const DEFAULT_MAX_LEASE_RENEWAL_SECS: u64 = 3600;
/// Renewal intervals below this flood the broker; shorter configured values
/// are clamped up
pub const MIN_LEASE_RENEWAL_INTERVAL: Duration = Duration::from_secs(1);

// DNS resolution engine
/// Default number of concurrent DNS workers
pub const DEFAULT_DNS_WORKER_COUNT: usize = 50;
/// Default DNS query rate limit (queries per second, shared across workers)
pub const DEFAULT_DNS_RATE_LIMIT: u32 = 1000;
/// Default shard count for the DNS result map
pub const DEFAULT_DNS_SHARD_COUNT: usize = 16;
/// Per-query DNS timeout in seconds
pub const DNS_QUERY_TIMEOUT_SECS: u64 = 3;

// Notifications
/// Default timeout for orchestrator callback requests in seconds
pub const DEFAULT_NOTIFICATION_TIMEOUT_SECS: u64 = 30;
/// Default timeout for step webhook requests in seconds
pub const DEFAULT_STEP_WEBHOOK_TIMEOUT_SECS: u64 = 30;

// Subfinder
/// Soft cap on enumeration time passed to the subfinder tool, in seconds
pub const SUBFINDER_ENUMERATION_SECS: u64 = 30;
/// Hard timeout on the subfinder process
pub const SUBFINDER_HARD_TIMEOUT: Duration = Duration::from_secs(60);

// HTTPX
/// Probe concurrency passed to the httpx tool
pub const HTTPX_THREADS: u32 = 50;
/// Per-probe timeout passed to the httpx tool, in seconds
pub const HTTPX_PROBE_TIMEOUT_SECS: u64 = 10;

// Naabu target-set size classes; rate, concurrency, timeout and retries are
// chosen per class
/// Upper bound of the "small" target-set class
pub const NAABU_SMALL_TARGET_SET: usize = 5;
/// Upper bound of the "medium" target-set class
pub const NAABU_MEDIUM_TARGET_SET: usize = 20;

// Nuclei
/// Default template directory for the nuclei engine
pub const NUCLEI_TEMPLATES_DIR: &str = "/root/nuclei-templates";
/// Template concurrency passed to the nuclei tool
pub const NUCLEI_TEMPLATE_CONCURRENCY: u32 = 200;
/// Host concurrency passed to the nuclei tool
pub const NUCLEI_HOST_CONCURRENCY: u32 = 10;
/// Global request rate limit passed to the nuclei tool (requests per second)
pub const NUCLEI_RATE_LIMIT: u32 = 500;
