//! DNS resolver initialization.
//!
//! The resolver is configured against a fixed set of well-known public
//! resolvers rather than the system configuration: bulk resolution must
//! behave identically regardless of which container or host the worker runs
//! on.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

use crate::config::constants::DNS_QUERY_TIMEOUT_SECS;
use crate::error_handling::InitializationError;

/// Public resolvers used for bulk resolution: Cloudflare, Google, Quad9,
/// OpenDNS, AdGuard (primary/secondary pairs).
const UPSTREAM_RESOLVERS: &[&str] = &[
    "1.1.1.1",
    "1.0.0.1",
    "8.8.8.8",
    "8.8.4.4",
    "9.9.9.9",
    "149.112.112.112",
    "208.67.222.222",
    "208.67.220.220",
    "94.140.14.14",
    "94.140.15.15",
];

/// Initializes the shared DNS resolver for the worker pool.
///
/// Query types are restricted per-call by the pool (A and CNAME); the
/// resolver itself is tuned to fail fast: short per-query timeout, a single
/// retry attempt, no search-domain appending.
///
/// # Errors
///
/// Returns `InitializationError::DnsResolver` if the upstream resolver set
/// cannot be parsed, which would be a programming error rather than an
/// environmental one.
pub fn init_resolver() -> Result<Arc<TokioAsyncResolver>, InitializationError> {
    let ips: Vec<IpAddr> = UPSTREAM_RESOLVERS
        .iter()
        .map(|ip| {
            ip.parse::<IpAddr>()
                .map_err(|e| InitializationError::DnsResolver(format!("bad resolver ip {ip}: {e}")))
        })
        .collect::<Result<_, _>>()?;

    let group = NameServerConfigGroup::from_ips_clear(&ips, 53, true);
    let config = ResolverConfig::from_parts(None, vec![], group);

    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(DNS_QUERY_TIMEOUT_SECS);
    opts.attempts = 1;
    // Hosts are always fully qualified; never append search domains
    opts.ndots = 0;
    opts.use_hosts_file = true;

    Ok(Arc::new(TokioAsyncResolver::tokio(config, opts)))
}
