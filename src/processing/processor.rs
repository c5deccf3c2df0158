//! Message lifecycle controller: the worker's outer loop.
//!
//! Receives one leased message at a time, parses it, drives it through the
//! retry engine and lease supervisor, and finalizes it exactly once:
//! complete, abandon (for broker-level redelivery), or dead-letter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::constants::{IDLE_PAUSE, RECEIVE_WAIT_FLOOR, RETRY_BASE_DELAY, RETRY_MAX_ATTEMPTS};
use crate::config::Config;
use crate::error_handling::{classify_text, ProcessingStats};
use crate::handler::TaskHandler;
use crate::models::{MessageProcessingResult, TaskMessage};
use crate::processing::renewal::process_with_renewal;
use crate::processing::retry::retry_processing;
use crate::transport::{
    QueueConsumer, ReceivedMessage, DEAD_LETTER_INVALID_FORMAT, DEAD_LETTER_PROCESSING_FAILED,
    PROPERTY_LAST_ERROR, PROPERTY_RETRY_COUNT,
};

/// Drives the receive/process/finalize loop.
pub struct MessageProcessor {
    queue: Arc<dyn QueueConsumer>,
    handler: Arc<TaskHandler>,
    stats: Arc<ProcessingStats>,
    poll_interval: Duration,
    lease_renewal_interval: Duration,
    max_lease_renewal_time: Duration,
}

impl MessageProcessor {
    /// Creates the processor from the worker configuration.
    pub fn new(
        queue: Arc<dyn QueueConsumer>,
        handler: Arc<TaskHandler>,
        stats: Arc<ProcessingStats>,
        config: &Config,
    ) -> Self {
        Self {
            queue,
            handler,
            stats,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            lease_renewal_interval: Duration::from_secs(config.lease_renewal_interval_secs),
            max_lease_renewal_time: Duration::from_secs(config.max_lease_renewal_secs),
        }
    }

    /// Runs the loop until `cancel` fires. Per-message errors are logged and
    /// never break the loop.
    pub async fn run(&self, cancel: &CancellationToken) {
        info!("Starting message processing loop");
        loop {
            if cancel.is_cancelled() {
                info!("Message processing stopped");
                return;
            }

            if let Err(e) = self.process_next(cancel).await {
                error!("Error processing message: {e}");
            }

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(IDLE_PAUSE) => {}
            }
        }
    }

    /// Receives and fully processes at most one message.
    async fn process_next(&self, cancel: &CancellationToken) -> anyhow::Result<()> {
        let receive_wait = self.poll_interval.max(RECEIVE_WAIT_FLOOR);

        let message = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            received = self.queue.receive(receive_wait) => received?,
        };
        let Some(message) = message else {
            debug!("Receive wait elapsed with no messages; this is normal when the queue is idle");
            return Ok(());
        };

        debug!("Received message: {}", message.id);

        // Parse failures skip the retry engine entirely: a body that is not
        // JSON today will not be JSON on redelivery either
        let task: TaskMessage = match serde_json::from_str(&message.body) {
            Ok(task) => task,
            Err(e) => {
                warn!("Dead-lettering message {} with malformed body: {e}", message.id);
                self.queue
                    .dead_letter(
                        &message,
                        DEAD_LETTER_INVALID_FORMAT,
                        &format!("failed to parse message as JSON: {e}"),
                    )
                    .await?;
                return Ok(());
            }
        };

        let result = retry_processing(cancel, RETRY_BASE_DELAY, || {
            process_with_renewal(
                cancel,
                Arc::clone(&self.queue),
                &message,
                &task,
                Arc::clone(&self.handler),
                self.lease_renewal_interval,
                self.max_lease_renewal_time,
            )
        })
        .await;

        self.finalize(&message, &result).await
    }

    /// Applies exactly one finalization verb based on the processing outcome.
    async fn finalize(
        &self,
        message: &ReceivedMessage,
        result: &MessageProcessingResult,
    ) -> anyhow::Result<()> {
        if result.success {
            self.queue.complete(message).await?;
            debug!("Message completed: {}", message.id);
            return Ok(());
        }

        let error_text = result.error.as_deref().unwrap_or("unknown error");
        self.stats.increment(classify_text(error_text));

        if result.retryable && result.retry_count < RETRY_MAX_ATTEMPTS {
            let properties = HashMap::from([
                (
                    PROPERTY_RETRY_COUNT.to_string(),
                    (result.retry_count + 1).to_string(),
                ),
                (PROPERTY_LAST_ERROR.to_string(), error_text.to_string()),
            ]);
            self.queue.abandon(message, properties).await?;
            warn!(
                "Message abandoned for redelivery: {}, error: {error_text}",
                message.id
            );
            return Ok(());
        }

        let description = format!(
            "Failed after {} attempts: {error_text}",
            result.retry_count + 1
        );
        self.queue
            .dead_letter(message, DEAD_LETTER_PROCESSING_FAILED, &description)
            .await?;
        error!("Message dead-lettered: {}, {description}", message.id);
        Ok(())
    }
}
