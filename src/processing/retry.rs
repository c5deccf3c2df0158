//! Retry engine with exponential backoff.
//!
//! Wraps the lease-supervised handler invocation in up to
//! [`RETRY_MAX_ATTEMPTS`](crate::config::constants::RETRY_MAX_ATTEMPTS)
//! attempts. Only retryable failures burn additional attempts; the final
//! attempt's verdict (including its retryability) is returned so the
//! lifecycle controller can decide between abandoning and dead-lettering.

use std::future::Future;
use std::time::Duration;

use log::warn;
use tokio_util::sync::CancellationToken;

use crate::config::constants::RETRY_MAX_ATTEMPTS;
use crate::models::MessageProcessingResult;

/// Runs `op` with exponential backoff between failed attempts.
///
/// Attempts are 0-indexed; the delay after attempt `n` is `base << n`
/// (1s, 2s, 4s, ... for a 1s base). Cancellation is honored before each
/// attempt and during the backoff sleep, producing a non-retryable outcome so
/// a shutting-down worker releases the message promptly.
pub async fn retry_processing<F, Fut>(
    cancel: &CancellationToken,
    base_delay: Duration,
    mut op: F,
) -> MessageProcessingResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = MessageProcessingResult>,
{
    for attempt in 0..RETRY_MAX_ATTEMPTS {
        if cancel.is_cancelled() {
            let mut result =
                MessageProcessingResult::failure("processing cancelled by shutdown", false);
            result.retry_count = attempt;
            return result;
        }

        let mut result = op().await;
        result.retry_count = attempt;

        if result.success || !result.retryable || attempt + 1 == RETRY_MAX_ATTEMPTS {
            return result;
        }

        let delay = base_delay * 2u32.pow(attempt);
        warn!(
            "Processing failed (attempt {}/{}), retrying in {:?}: {}",
            attempt + 1,
            RETRY_MAX_ATTEMPTS,
            delay,
            result.error.as_deref().unwrap_or("unknown error"),
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                let mut result =
                    MessageProcessingResult::failure("processing cancelled by shutdown", false);
                result.retry_count = attempt;
                return result;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }

    // Unreachable with RETRY_MAX_ATTEMPTS >= 1; kept as a deterministic
    // terminal outcome
    let mut result = MessageProcessingResult::failure("max retries exceeded", false);
    result.retry_count = RETRY_MAX_ATTEMPTS.saturating_sub(1);
    result
}
