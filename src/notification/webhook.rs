//! Lifecycle step notifications to a chat webhook.
//!
//! Each processing step can fire an embed-style message into a chat room.
//! Everything here is best-effort: a missing webhook URL disables the
//! notifier, and send failures are the caller's to log and forget.

use std::time::Duration;

use log::debug;
use serde::Serialize;
use strum_macros::EnumIter;

use crate::error_handling::AppError;
use crate::initialization::init_http_client;
use crate::models::{TaskMessage, TaskResult};

/// Lifecycle steps that can be announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum NotificationStep {
    /// A task message was received and parsed
    TaskReceived,
    /// The scanner is about to run
    TaskStarted,
    /// The scanner finished successfully
    TaskCompleted,
    /// Validation or the scanner failed
    TaskFailed,
    /// The result was persisted to the blob store
    ResultStored,
    /// The orchestrator callback was delivered
    NotificationSent,
}

impl NotificationStep {
    /// Wire name of the step.
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationStep::TaskReceived => "task_received",
            NotificationStep::TaskStarted => "task_started",
            NotificationStep::TaskCompleted => "task_completed",
            NotificationStep::TaskFailed => "task_failed",
            NotificationStep::ResultStored => "result_stored",
            NotificationStep::NotificationSent => "notification_sent",
        }
    }

    fn title(self) -> &'static str {
        match self {
            NotificationStep::TaskReceived => "Task Received",
            NotificationStep::TaskStarted => "Task Started",
            NotificationStep::TaskCompleted => "Task Completed",
            NotificationStep::TaskFailed => "Task Failed",
            NotificationStep::ResultStored => "Result Stored",
            NotificationStep::NotificationSent => "Notification Sent",
        }
    }

    fn color(self) -> u32 {
        match self {
            NotificationStep::TaskReceived => COLOR_INFO,
            NotificationStep::TaskStarted => COLOR_PURPLE,
            NotificationStep::TaskCompleted => COLOR_SUCCESS,
            NotificationStep::TaskFailed => COLOR_ERROR,
            NotificationStep::ResultStored => COLOR_INFO,
            NotificationStep::NotificationSent => COLOR_SUCCESS,
        }
    }
}

const COLOR_INFO: u32 = 0x3498db;
const COLOR_SUCCESS: u32 = 0x2ecc71;
const COLOR_ERROR: u32 = 0xe74c3c;
const COLOR_PURPLE: u32 = 0x9b59b6;

#[derive(Debug, Serialize)]
struct WebhookPayload {
    username: &'static str,
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField>,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: &'static str,
    value: String,
    inline: bool,
}

/// Fires lifecycle embeds at a chat webhook.
pub struct StepNotifier {
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl StepNotifier {
    /// Creates the notifier. An empty URL produces a disabled notifier whose
    /// sends are no-ops.
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Self {
        let url = webhook_url.into();
        Self {
            webhook_url: if url.is_empty() { None } else { Some(url) },
            client: init_http_client(timeout).unwrap_or_default(),
        }
    }

    /// A notifier that never sends anything.
    pub fn disabled() -> Self {
        Self {
            webhook_url: None,
            client: reqwest::Client::new(),
        }
    }

    /// Whether sends will actually go anywhere.
    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn build_payload(
        step: NotificationStep,
        task: &TaskMessage,
        result: Option<&TaskResult>,
        error: Option<&str>,
    ) -> WebhookPayload {
        let mut fields = vec![
            EmbedField {
                name: "Task",
                value: task.task.clone(),
                inline: true,
            },
            EmbedField {
                name: "Domain",
                value: task.domain.clone(),
                inline: true,
            },
            EmbedField {
                name: "Scan ID",
                value: task.scan_id.clone(),
                inline: true,
            },
        ];

        if let Some(result) = result {
            if let Some(data) = &result.data {
                fields.push(EmbedField {
                    name: "Count",
                    value: data.count().to_string(),
                    inline: true,
                });
            }
            if let Some(duration) = &result.duration {
                fields.push(EmbedField {
                    name: "Duration",
                    value: duration.clone(),
                    inline: true,
                });
            }
        }

        if let Some(error) = error {
            fields.push(EmbedField {
                name: "Error",
                value: error.to_string(),
                inline: false,
            });
        }

        WebhookPayload {
            username: "asm-worker",
            embeds: vec![Embed {
                title: step.title().to_string(),
                color: step.color(),
                fields,
                timestamp: chrono::Utc::now().to_rfc3339(),
            }],
        }
    }

    /// Sends a step embed.
    ///
    /// # Errors
    ///
    /// Returns a network error on transport failure or non-2xx response;
    /// callers log and absorb it.
    pub async fn notify_step(
        &self,
        step: NotificationStep,
        task: &TaskMessage,
        result: Option<&TaskResult>,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        let Some(url) = &self.webhook_url else {
            return Ok(());
        };

        let payload = Self::build_payload(step, task, result, error);
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::network("failed to send step webhook", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::network(
                format!("step webhook returned status {status}"),
                std::io::Error::other(format!("HTTP {status}")),
            ));
        }

        debug!("Sent step notification: {}", step.as_str());
        Ok(())
    }
}
