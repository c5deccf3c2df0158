//! Orchestrator completion callbacks.
//!
//! When a task finalizes, the orchestrator is told by raising an event on the
//! task's instance: `POST {endpoint}/instances/{id}/raiseEvent/{task}_completed`.
//! The call is best-effort from the task's perspective; failures are retried
//! here and then absorbed by the caller.

use std::time::Duration;

use log::{info, warn};
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;

use crate::error_handling::AppError;
use crate::initialization::init_http_client;

/// Raises `{task}_completed` events against the orchestrator API.
pub struct CompletionNotifier {
    endpoint: String,
    key: String,
    client: reqwest::Client,
}

impl CompletionNotifier {
    /// Creates the notifier.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when endpoint or key is empty, or when
    /// the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let endpoint = endpoint.into();
        let key = key.into();
        if endpoint.is_empty() {
            return Err(AppError::configuration(
                "DURABLE_API_ENDPOINT",
                "orchestrator endpoint is required",
            ));
        }
        if key.is_empty() {
            return Err(AppError::configuration(
                "DURABLE_API_KEY",
                "orchestrator key is required",
            ));
        }
        let client = init_http_client(timeout)
            .map_err(|e| AppError::configuration("http_client", e.to_string()))?;
        Ok(Self {
            endpoint,
            key,
            client,
        })
    }

    fn event_url(&self, instance_id: &str, task: &str) -> String {
        format!(
            "{}/instances/{}/raiseEvent/{}_completed?code={}",
            self.endpoint.trim_end_matches('/'),
            instance_id,
            task,
            self.key
        )
    }

    async fn raise_event(&self, url: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await
            .map_err(|e| AppError::network("failed to send notification request", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::network(
                format!("notification request failed with status {status}"),
                std::io::Error::other(format!("HTTP {status}")),
            ));
        }
        Ok(())
    }

    /// Raises the completion event for a task, retrying transient failures
    /// with 1s/2s/4s backoff.
    ///
    /// # Errors
    ///
    /// Returns the last failure after all attempts; the caller logs and
    /// absorbs it so notification trouble never fails the task itself.
    pub async fn notify_completion(&self, instance_id: &str, task: &str) -> Result<(), AppError> {
        let url = self.event_url(instance_id, task);
        info!("Notifying orchestrator: {task}_completed for instance {instance_id}");

        // 2^n * 500ms: 1s, 2s, 4s between the four attempts
        let strategy = ExponentialBackoff::from_millis(2).factor(500).take(3);
        let result = Retry::spawn(strategy, || async {
            match self.raise_event(&url).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    warn!("Notification attempt failed: {e}");
                    Err(e)
                }
            }
        })
        .await;

        if result.is_ok() {
            info!("Successfully raised '{task}_completed' for instance '{instance_id}'");
        }
        result
    }
}
