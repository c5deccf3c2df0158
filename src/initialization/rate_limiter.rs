//! Token-bucket rate limiter.
//!
//! Admission control for the DNS worker pool: workers block on
//! [`RateLimiter::acquire`] until a token is available. Tokens are replenished
//! by a background task at the configured rate.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::{interval, Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Token-bucket rate limiter shared across workers.
///
/// Tokens are replenished continuously at the configured rate; the burst
/// capacity allows short spikes above it. The replenishment task runs until
/// the returned shutdown token is cancelled.
pub struct RateLimiter {
    permits: Arc<Semaphore>,
}

impl RateLimiter {
    /// Takes one token, waiting until one is available.
    pub async fn acquire(&self) {
        // Permits are added by the replenisher and never closed, so acquire
        // only fails after shutdown; treat that as a free pass
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

/// Creates a rate limiter replenishing `rps` tokens per second with the given
/// burst capacity, plus the token that stops the replenishment task.
pub fn init_rate_limiter(rps: u32, burst: usize) -> (Arc<RateLimiter>, CancellationToken) {
    let shutdown = CancellationToken::new();
    let limiter = Arc::new(RateLimiter {
        permits: Arc::new(Semaphore::new(burst)),
    });

    let permits = Arc::clone(&limiter.permits);
    let shutdown_task = shutdown.clone();
    // The bucket must hold at least one tick's worth of tokens or the
    // replenishment cadence itself would cap throughput below `rps`
    let capacity = burst.max(rps as usize / 10 + 1);
    // Fast ticker; the number of permits added per tick is derived from the
    // actually elapsed time so bursts of scheduler delay do not lose tokens
    let mut ticker = interval(Duration::from_millis(100));
    tokio::spawn(async move {
        let mut last = Instant::now();
        let mut fractional = 0.0f64;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed = now.duration_since(last);
                    last = now;

                    let due = f64::from(rps) * elapsed.as_secs_f64() + fractional;
                    let whole = due.floor();
                    fractional = due - whole;

                    // Cap outstanding permits at the bucket capacity
                    let available = permits.available_permits();
                    let add = (whole as usize).min(capacity.saturating_sub(available));
                    if add > 0 {
                        permits.add_permits(add);
                    }
                }
                _ = shutdown_task.cancelled() => {
                    log::debug!("Rate limiter replenishment task shutting down");
                    break;
                }
            }
        }
    });

    (limiter, shutdown)
}
