//! The DNS worker pool.
//!
//! Tens of thousands of hosts flow through a bounded work channel into a
//! fixed set of workers, each of which takes a rate-limiter token, performs
//! one multi-record lookup, and publishes into a bounded result channel. A
//! single collector writes results into the sharded map. Teardown order is
//! strict: feeder closes the work channel, workers drain and exit, the result
//! channel closes, the collector finishes, then the map is drained.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::initialization::init_rate_limiter;
use crate::models::{ResolutionInfo, ResolutionStatus};

use super::resolver::HostResolver;
use super::sharded::ShardedResultMap;

/// Tuning knobs for one pool run.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of concurrent resolution workers
    pub worker_count: usize,
    /// Queries per second across all workers
    pub rate_limit: u32,
    /// Shard count for the result map
    pub shard_count: usize,
}

/// Resolves every host in `hosts` and returns the host-to-resolution map.
///
/// Whitespace-only entries are skipped. Cancellation stops feeding and makes
/// workers return at their next suspension point; results produced before the
/// result channel closed are all visible in the returned map.
pub async fn resolve_all(
    cancel: &CancellationToken,
    resolver: Arc<dyn HostResolver>,
    config: &PoolConfig,
    hosts: Vec<String>,
) -> BTreeMap<String, ResolutionInfo> {
    let worker_count = config.worker_count.max(1);
    let host_count = hosts.len();

    // Buffers scale with the workload but stay bounded by the worker count
    let work_buffer = host_count.min(worker_count * 4).max(1);
    let result_buffer = host_count.min(worker_count * 2).max(1);

    let (work_tx, work_rx) = mpsc::channel::<String>(work_buffer);
    let (result_tx, mut result_rx) = mpsc::channel::<(String, ResolutionInfo)>(result_buffer);
    let work_rx = Arc::new(Mutex::new(work_rx));

    let burst = worker_count.min(config.rate_limit.saturating_mul(2) as usize).max(1);
    let (limiter, limiter_shutdown) = init_rate_limiter(config.rate_limit, burst);

    let results = Arc::new(ShardedResultMap::new(config.shard_count));

    // Collector: the only writer into the sharded map
    let collector_results = Arc::clone(&results);
    let collector = tokio::spawn(async move {
        while let Some((host, info)) = result_rx.recv().await {
            collector_results.set(host, info);
        }
    });

    // Workers
    let mut workers = JoinSet::new();
    for _ in 0..worker_count {
        let work_rx = Arc::clone(&work_rx);
        let result_tx = result_tx.clone();
        let resolver = Arc::clone(&resolver);
        let limiter = Arc::clone(&limiter);
        let cancel = cancel.clone();
        workers.spawn(async move {
            loop {
                let host = {
                    let mut rx = work_rx.lock().await;
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        host = rx.recv() => match host {
                            Some(host) => host,
                            None => return,
                        },
                    }
                };

                let host = host.trim().to_string();
                if host.is_empty() {
                    continue;
                }

                tokio::select! {
                    _ = cancel.cancelled() => return,
                    () = limiter.acquire() => {}
                }

                let info = tokio::select! {
                    _ = cancel.cancelled() => return,
                    info = lookup_host(resolver.as_ref(), &host) => info,
                };

                tokio::select! {
                    _ = cancel.cancelled() => return,
                    sent = result_tx.send((host, info)) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        });
    }
    drop(result_tx);

    // Feeder: pushes hosts and closes the work channel by dropping the sender
    let feeder_cancel = cancel.clone();
    let feeder = tokio::spawn(async move {
        for host in hosts {
            tokio::select! {
                _ = feeder_cancel.cancelled() => return,
                sent = work_tx.send(host) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    });

    // Teardown order: workers first (their result senders must drop before
    // the collector can observe channel closure), then the collector
    while workers.join_next().await.is_some() {}
    let _ = feeder.await;
    let _ = collector.await;
    limiter_shutdown.cancel();

    debug!(
        "DNS pool finished: {} hosts in, {} results out",
        host_count,
        results.len()
    );

    results.drain()
}

/// Resolves one host. Resolver errors map to `error` status, an empty record
/// set to `not_resolved`.
async fn lookup_host(resolver: &dyn HostResolver, host: &str) -> ResolutionInfo {
    match resolver.resolve(host).await {
        Err(e) => {
            debug!("DNS lookup error for {host}: {e}");
            ResolutionInfo {
                status: ResolutionStatus::Error,
                a: vec![],
                cname: vec![],
            }
        }
        Ok(records) => {
            let status = if records.a.is_empty() && records.cname.is_empty() {
                ResolutionStatus::NotResolved
            } else {
                ResolutionStatus::Resolved
            };
            ResolutionInfo {
                status,
                a: records.a,
                cname: records.cname,
            }
        }
    }
}
