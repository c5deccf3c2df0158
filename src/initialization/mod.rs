//! Shared resource initialization: logger, HTTP clients, DNS resolver, rate
//! limiter.
//!
//! All initialization functions return proper error types so startup failures
//! surface as non-zero exit codes instead of panics.

mod client;
mod logger;
mod rate_limiter;
mod resolver;

pub use client::init_http_client;
pub use logger::init_logger;
pub use rate_limiter::{init_rate_limiter, RateLimiter};
pub use resolver::init_resolver;
