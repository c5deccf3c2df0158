//! Lease renewal supervisor.
//!
//! Long scans outlive the broker's message lease. This supervisor runs the
//! handler and a renewal loop as siblings under one operation scope: the
//! renewer extends the lease immediately and then on every tick, and either
//! side's failure cancels the scope. Losing the lease makes the attempt
//! retryable; the work itself may have been fine.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::constants::MIN_LEASE_RENEWAL_INTERVAL;
use crate::handler::TaskHandler;
use crate::models::{MessageProcessingResult, TaskMessage};
use crate::transport::{QueueConsumer, ReceivedMessage};

/// Runs the handler under lease renewal.
///
/// The operation is bounded by `max_renewal_time`; within it, the lease is
/// renewed every `renewal_interval` (clamped to at least one second). The
/// first renewal happens synchronously before the ticker starts, so the lease
/// is freshly extended by the time long work begins.
pub async fn process_with_renewal(
    cancel: &CancellationToken,
    queue: Arc<dyn QueueConsumer>,
    message: &ReceivedMessage,
    task: &TaskMessage,
    handler: Arc<TaskHandler>,
    renewal_interval: Duration,
    max_renewal_time: Duration,
) -> MessageProcessingResult {
    let renewal_interval = if renewal_interval < MIN_LEASE_RENEWAL_INTERVAL {
        warn!(
            "Lease renewal interval too short ({renewal_interval:?}), using minimum of {MIN_LEASE_RENEWAL_INTERVAL:?}"
        );
        MIN_LEASE_RENEWAL_INTERVAL
    } else {
        renewal_interval
    };

    let op_token = cancel.child_token();

    // Handler child
    let (done_tx, mut done_rx) = mpsc::channel::<MessageProcessingResult>(1);
    let handler_token = op_token.clone();
    let handler_task = task.clone();
    tokio::spawn(async move {
        let result = handler.handle(&handler_token, &handler_task).await;
        let _ = done_tx.send(result).await;
    });

    // Renewer child
    let (renew_err_tx, mut renew_err_rx) = mpsc::channel::<anyhow::Error>(1);
    let renewer_token = op_token.clone();
    let renewer_queue = Arc::clone(&queue);
    let renewer_message = message.clone();
    tokio::spawn(async move {
        // First renewal up front: the receive itself may have consumed a
        // meaningful share of the initial lease
        if let Err(e) = renewer_queue.renew_lease(&renewer_message).await {
            warn!("Failed to renew message lease initially: {e}");
            let _ = renew_err_tx.send(e).await;
            return;
        }
        debug!("Initial lease renewal successful");

        let mut ticker = tokio::time::interval(renewal_interval);
        ticker.tick().await; // first tick fires immediately; already renewed
        loop {
            tokio::select! {
                _ = renewer_token.cancelled() => {
                    debug!("Lease renewal stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = renewer_queue.renew_lease(&renewer_message).await {
                        warn!("Failed to renew message lease: {e}");
                        let _ = renew_err_tx.send(e).await;
                        return;
                    }
                    debug!("Message lease renewed");
                }
            }
        }
    });

    let outcome = tokio::select! {
        result = done_rx.recv() => match result {
            Some(result) => result,
            // Handler task died without reporting; treat as transient
            None => MessageProcessingResult::failure("handler terminated unexpectedly", true),
        },
        Some(e) = renew_err_rx.recv() => {
            MessageProcessingResult::failure(format!("lease renewal failed: {e}"), true)
        }
        _ = tokio::time::sleep(max_renewal_time) => {
            MessageProcessingResult::failure(
                format!("operation exceeded max lease renewal time of {max_renewal_time:?}"),
                true,
            )
        }
        _ = cancel.cancelled() => {
            MessageProcessingResult::failure("processing cancelled", true)
        }
    };

    // Whichever arm won, both children stop here
    op_token.cancel();
    outcome
}
