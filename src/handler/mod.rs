//! Task orchestrator: validate, dispatch, persist, notify.
//!
//! The handler turns one parsed task message into a
//! [`MessageProcessingResult`]: it validates the message, looks up the
//! scanner, runs it under a per-attempt timeout, persists the outcome, and
//! raises the completion event. Step notifications fire at every stage but
//! never influence the verdict.

mod input;

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::error_handling::{is_retryable_error, AppError};
use crate::models::{
    MessageProcessingResult, ScanData, TaskKind, TaskMessage, TaskResult, TaskStatus,
};
use crate::notification::{CompletionNotifier, NotificationStep, StepNotifier};
use crate::scanners::ScannerRegistry;
use crate::storage::BlobSink;
use crate::utils::format_duration;
use crate::validation::validate_task_message;

pub use input::build_scanner_input;

/// Orchestrates the processing of a single task message.
pub struct TaskHandler {
    registry: ScannerRegistry,
    blob: Arc<BlobSink>,
    completion: Option<CompletionNotifier>,
    steps: StepNotifier,
    scanner_timeout: Duration,
}

impl TaskHandler {
    /// Creates the handler.
    ///
    /// `completion` is `None` when orchestrator notifications are disabled.
    pub fn new(
        registry: ScannerRegistry,
        blob: Arc<BlobSink>,
        completion: Option<CompletionNotifier>,
        steps: StepNotifier,
        scanner_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            blob,
            completion,
            steps,
            scanner_timeout,
        }
    }

    /// Processes one task message to completion.
    ///
    /// Validation failures are non-retryable and never persisted; scanner
    /// failures are classified for retriability; persistence failures are
    /// retryable; notification failures are logged and absorbed.
    pub async fn handle(
        &self,
        cancel: &CancellationToken,
        msg: &TaskMessage,
    ) -> MessageProcessingResult {
        info!("Processing task: {} for domain: {}", msg.task, msg.domain);
        self.fire_step(NotificationStep::TaskReceived, msg, None, None).await;

        if let Err(e) = validate_task_message(msg) {
            warn!("Task validation failed: {e}");
            self.fire_step(NotificationStep::TaskFailed, msg, None, Some(&e.to_string()))
                .await;
            return MessageProcessingResult::failure(e.to_string(), false);
        }
        let Some(kind) = msg.kind() else {
            return MessageProcessingResult::failure(
                format!("unknown task type: {}", msg.task),
                false,
            );
        };

        let mut result = TaskResult::running(kind, &msg.scan_id, &msg.domain);
        let start = Instant::now();

        self.fire_step(NotificationStep::TaskStarted, msg, Some(&result), None).await;

        let outcome = self.run_scanner(cancel, kind, msg).await;

        let data = match outcome {
            Err(e) => {
                result.status = TaskStatus::Failed;
                result.error = Some(e.to_string());
                result.duration = Some(format_duration(start.elapsed()));
                let retryable = is_retryable_error(&e);
                error!("Task failed: {e}");
                self.fire_step(NotificationStep::TaskFailed, msg, Some(&result), Some(&e.to_string()))
                    .await;
                return MessageProcessingResult::failure(e.to_string(), retryable);
            }
            Ok(data) => data,
        };

        result.status = TaskStatus::Completed;
        result.duration = Some(format_duration(start.elapsed()));
        result.data = Some(data);
        info!(
            "Task completed: {} for {} ({} results in {})",
            msg.task,
            msg.domain,
            result.data.as_ref().map_or(0, ScanData::count),
            result.duration.as_deref().unwrap_or("-"),
        );
        self.fire_step(NotificationStep::TaskCompleted, msg, Some(&result), None).await;

        if let Err(e) = self.persist(&result).await {
            error!("Failed to store task result: {e}");
            return MessageProcessingResult::failure(e.to_string(), true);
        }
        self.fire_step(NotificationStep::ResultStored, msg, Some(&result), None).await;

        self.notify_completion(msg, &result).await;

        MessageProcessingResult::ok()
    }

    /// Looks up the scanner, builds its typed input, and runs it under the
    /// per-attempt timeout.
    async fn run_scanner(
        &self,
        cancel: &CancellationToken,
        kind: TaskKind,
        msg: &TaskMessage,
    ) -> Result<ScanData, AppError> {
        let scanner = self.registry.get(kind)?;
        let input = build_scanner_input(kind, msg)?;

        // The scanner sees a child token so a per-attempt timeout cancels it
        // without touching the message-level context
        let scan_cancel = cancel.child_token();
        let execution = scanner.execute(&scan_cancel, input);

        match tokio::time::timeout(self.scanner_timeout, execution).await {
            Ok(outcome) => outcome,
            Err(_) => {
                scan_cancel.cancel();
                Err(AppError::timeout(format!(
                    "{} timed out after {}s",
                    scanner.name(),
                    self.scanner_timeout.as_secs()
                )))
            }
        }
    }

    /// Persists the completed result; subfinder results additionally get a
    /// plain-text rendition used downstream as a hosts list.
    async fn persist(&self, result: &TaskResult) -> Result<(), AppError> {
        self.blob.store_task_result(result).await?;

        if let Some(ScanData::Subfinder(data)) = &result.data {
            self.blob
                .store_subfinder_text(data, &result.scan_id, &result.task)
                .await?;
        }
        Ok(())
    }

    /// Raises the completion event; failures are logged, never propagated.
    async fn notify_completion(&self, msg: &TaskMessage, result: &TaskResult) {
        let Some(notifier) = &self.completion else {
            return;
        };
        if msg.instance_id.is_empty() {
            warn!("No instance_id on task; skipping orchestrator notification");
            return;
        }

        match notifier.notify_completion(&msg.instance_id, &result.task).await {
            Ok(()) => {
                self.fire_step(NotificationStep::NotificationSent, msg, Some(result), None).await;
            }
            Err(e) => {
                warn!("Failed to notify orchestrator (task remains completed): {e}");
            }
        }
    }

    /// Fires a step event; failures are logged at warn and swallowed here,
    /// deliberately and visibly.
    async fn fire_step(
        &self,
        step: NotificationStep,
        msg: &TaskMessage,
        result: Option<&TaskResult>,
        error: Option<&str>,
    ) {
        if let Err(e) = self.steps.notify_step(step, msg, result, error).await {
            warn!("Step notification '{}' failed: {e}", step.as_str());
        }
    }
}
