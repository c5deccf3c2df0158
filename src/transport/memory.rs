//! In-memory queue implementation.
//!
//! Backs local runs and the integration test suite. Lease bookkeeping is
//! simplified to what the worker observes: finalization verbs are recorded,
//! and lease renewals can be scripted to fail after a set count.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{QueueConsumer, ReceivedMessage};

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<ReceivedMessage>,
    completed: Vec<String>,
    abandoned: Vec<(String, HashMap<String, String>)>,
    dead_lettered: Vec<(String, String, String)>,
    renewals: u64,
    fail_renewals_after: Option<u64>,
}

/// A process-local queue with scripted lease behavior.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    next_id: AtomicU64,
}

impl InMemoryQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a message body.
    pub fn push(&self, body: impl Into<String>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().expect("queue mutex poisoned");
        state.pending.push_back(ReceivedMessage {
            id: format!("msg-{id}"),
            body: body.into(),
            delivery_count: 1,
        });
    }

    /// Makes every lease renewal after the first `n` fail.
    pub fn fail_renewals_after(&self, n: u64) {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        state.fail_renewals_after = Some(n);
    }

    /// Ids of completed messages.
    pub fn completed(&self) -> Vec<String> {
        self.state.lock().expect("queue mutex poisoned").completed.clone()
    }

    /// Ids and properties of abandoned messages.
    pub fn abandoned(&self) -> Vec<(String, HashMap<String, String>)> {
        self.state.lock().expect("queue mutex poisoned").abandoned.clone()
    }

    /// Ids, reasons, and descriptions of dead-lettered messages.
    pub fn dead_lettered(&self) -> Vec<(String, String, String)> {
        self.state
            .lock()
            .expect("queue mutex poisoned")
            .dead_lettered
            .clone()
    }

    /// Number of lease renewals performed (successful or not).
    pub fn renewal_count(&self) -> u64 {
        self.state.lock().expect("queue mutex poisoned").renewals
    }
}

#[async_trait]
impl QueueConsumer for InMemoryQueue {
    async fn receive(&self, max_wait: Duration) -> anyhow::Result<Option<ReceivedMessage>> {
        let deadline = Instant::now() + max_wait;
        loop {
            {
                let mut state = self.state.lock().expect("queue mutex poisoned");
                if let Some(msg) = state.pending.pop_front() {
                    return Ok(Some(msg));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    async fn renew_lease(&self, _message: &ReceivedMessage) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        state.renewals += 1;
        if let Some(limit) = state.fail_renewals_after {
            if state.renewals > limit {
                anyhow::bail!("lease lost: renewal rejected by broker");
            }
        }
        Ok(())
    }

    async fn complete(&self, message: &ReceivedMessage) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        state.completed.push(message.id.clone());
        Ok(())
    }

    async fn abandon(
        &self,
        message: &ReceivedMessage,
        properties: HashMap<String, String>,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        state.abandoned.push((message.id.clone(), properties));
        Ok(())
    }

    async fn dead_letter(
        &self,
        message: &ReceivedMessage,
        reason: &str,
        description: &str,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("queue mutex poisoned");
        state
            .dead_lettered
            .push((message.id.clone(), reason.to_string(), description.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_receive_pops_in_order() {
        let queue = InMemoryQueue::new();
        queue.push("one");
        queue.push("two");

        let first = queue.receive(Duration::from_millis(10)).await.unwrap().unwrap();
        let second = queue.receive(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(first.body, "one");
        assert_eq!(second.body, "two");
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_receive_times_out_empty() {
        let queue = InMemoryQueue::new();
        let got = queue.receive(Duration::from_millis(30)).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_scripted_renewal_failure() {
        let queue = InMemoryQueue::new();
        queue.push("body");
        let msg = queue.receive(Duration::from_millis(10)).await.unwrap().unwrap();

        queue.fail_renewals_after(1);
        assert!(queue.renew_lease(&msg).await.is_ok());
        assert!(queue.renew_lease(&msg).await.is_err());
        assert_eq!(queue.renewal_count(), 2);
    }
}
