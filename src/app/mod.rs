//! Application shell: wiring, the main loop, and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error_handling::ProcessingStats;
use crate::handler::TaskHandler;
use crate::notification::{CompletionNotifier, StepNotifier};
use crate::processing::MessageProcessor;
use crate::scanners::ScannerRegistry;
use crate::storage::{BlobSink, BlobStore, FsBlobStore};
use crate::transport::{InMemoryQueue, QueueConsumer};

/// The assembled worker.
pub struct Application {
    processor: MessageProcessor,
    stats: Arc<ProcessingStats>,
    cancel: CancellationToken,
}

impl Application {
    /// Wires all components from the validated configuration.
    ///
    /// # Errors
    ///
    /// Fails when a required client cannot be constructed; the process should
    /// exit non-zero in that case.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        config.validate().context("invalid configuration")?;

        let queue = init_queue(&config).context("failed to initialize queue consumer")?;
        let store = init_blob_store(&config).context("failed to initialize blob store")?;
        let blob = Arc::new(BlobSink::new(store, config.blob_container.clone()));

        let registry = ScannerRegistry::new(Arc::clone(&blob), &config);
        info!("Registered scanners: {}", registry.available().join(", "));

        let completion = if config.enable_orchestrator_notifications {
            match CompletionNotifier::new(
                config.orchestrator_endpoint.clone(),
                config.orchestrator_key.clone(),
                Duration::from_secs(config.notification_timeout_secs),
            ) {
                Ok(notifier) => Some(notifier),
                Err(e) => {
                    warn!("Failed to initialize orchestrator notifier: {e}. Completion events will be disabled.");
                    None
                }
            }
        } else {
            None
        };

        let steps = if config.enable_step_notifications {
            StepNotifier::new(
                config.step_webhook_url.clone(),
                Duration::from_secs(config.step_webhook_timeout_secs),
            )
        } else {
            StepNotifier::disabled()
        };
        if !steps.is_enabled() {
            info!("Step notifications disabled");
        }

        let handler = Arc::new(TaskHandler::new(
            registry,
            blob,
            completion,
            steps,
            Duration::from_secs(config.scanner_timeout_secs),
        ));

        let stats = Arc::new(ProcessingStats::new());
        let processor = MessageProcessor::new(queue, handler, Arc::clone(&stats), &config);

        log_configuration(&config);

        Ok(Self {
            processor,
            stats,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops the worker when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs until a shutdown signal arrives, then drains and reports.
    pub async fn run(self) -> anyhow::Result<()> {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("Shutdown signal received, finishing current message...");
            cancel.cancel();
        });

        info!("Worker is running");
        self.processor.run(&self.cancel).await;

        self.stats.log_summary();
        info!("Application shutdown complete");
        Ok(())
    }
}

/// Builds the queue consumer for the configured transport.
///
/// A broker connection string selects the production transport; without one
/// the worker runs on the in-process queue, which is what local development
/// and the test suite use.
fn init_queue(config: &Config) -> anyhow::Result<Arc<dyn QueueConsumer>> {
    if config.queue_connection_string.is_empty() {
        warn!(
            "QUEUE_CONNECTION_STRING not set; using in-memory queue '{}'",
            config.queue_name
        );
        return Ok(Arc::new(InMemoryQueue::new()));
    }
    // The wire transport is provided by the deployment; local builds speak to
    // the in-memory queue only
    anyhow::bail!(
        "no transport available for connection string (queue '{}')",
        config.queue_name
    )
}

fn init_blob_store(config: &Config) -> anyhow::Result<Arc<dyn BlobStore>> {
    let root = if config.blob_connection_string.is_empty() {
        "./blob-data".to_string()
    } else {
        config.blob_connection_string.clone()
    };
    Ok(Arc::new(FsBlobStore::new(root)))
}

fn log_configuration(config: &Config) {
    info!("Starting ASM worker with configuration:");
    info!("  Queue: {}", config.queue_name);
    info!("  Blob container: {}", config.blob_container);
    info!("  Poll interval: {}s", config.poll_interval_secs);
    info!("  Scanner timeout: {}s", config.scanner_timeout_secs);
    info!(
        "  Lease renewal: every {}s, max {}s",
        config.lease_renewal_interval_secs, config.max_lease_renewal_secs
    );
    info!(
        "  Orchestrator notifications: {}",
        config.enable_orchestrator_notifications
    );
    info!(
        "  DNS pool: {} workers, {} qps, {} shards",
        config.dns_worker_count, config.dns_rate_limit, config.dns_shard_count
    );
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
