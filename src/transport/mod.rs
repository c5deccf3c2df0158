//! Message transport contract.
//!
//! The broker integration is reduced to the capability set the worker needs:
//! leased receive, lease renewal, and the three finalization verbs (complete,
//! abandon, dead-letter). Exactly one finalization verb is invoked per
//! receipt.

mod memory;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

pub use memory::InMemoryQueue;

/// Dead-letter reason for messages that exhausted processing.
pub const DEAD_LETTER_PROCESSING_FAILED: &str = "ProcessingFailed";
/// Dead-letter reason for messages whose body is not valid JSON.
pub const DEAD_LETTER_INVALID_FORMAT: &str = "InvalidMessageFormat";

/// Property attached to abandoned messages: incremented delivery retry count.
pub const PROPERTY_RETRY_COUNT: &str = "retry_count";
/// Property attached to abandoned messages: text of the last error.
pub const PROPERTY_LAST_ERROR: &str = "last_error";

/// A message received under a lease.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Broker-assigned message id; doubles as the lease handle
    pub id: String,
    /// Raw message body
    pub body: String,
    /// How many times this message has been delivered
    pub delivery_count: u32,
}

/// Capability set the worker requires from the message broker.
///
/// All operations act on the lease obtained by `receive`; once a finalization
/// verb succeeds the lease is gone and further operations on the message fail.
#[async_trait]
pub trait QueueConsumer: Send + Sync {
    /// Receives at most one message, waiting up to `max_wait`.
    ///
    /// Returns `Ok(None)` when the wait elapses with no message available;
    /// that is the normal idle case, not an error.
    async fn receive(&self, max_wait: Duration) -> anyhow::Result<Option<ReceivedMessage>>;

    /// Extends the lease on a received message.
    async fn renew_lease(&self, message: &ReceivedMessage) -> anyhow::Result<()>;

    /// Completes the message, removing it from the queue.
    async fn complete(&self, message: &ReceivedMessage) -> anyhow::Result<()>;

    /// Returns the message to the queue for redelivery, attaching properties.
    async fn abandon(
        &self,
        message: &ReceivedMessage,
        properties: HashMap<String, String>,
    ) -> anyhow::Result<()>;

    /// Moves the message to the dead-letter queue with a reason and
    /// description.
    async fn dead_letter(
        &self,
        message: &ReceivedMessage,
        reason: &str,
        description: &str,
    ) -> anyhow::Result<()>;
}
