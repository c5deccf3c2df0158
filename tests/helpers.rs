//! Shared test helpers: scripted scanners, a flaky blob store, and a wired
//! processor harness over the in-memory queue.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use asm_worker::{
    AppError, BlobSink, BlobStore, CompletionNotifier, FsBlobStore, InMemoryQueue,
    MessageProcessor, ProcessingStats, ScanData, Scanner, ScannerInput, ScannerRegistry,
    StepNotifier, SubfinderData, TaskHandler, TaskKind,
};

/// A scanner whose outcome per call is scripted in advance. Once the script
/// runs out, the last entry repeats.
pub struct ScriptedScanner {
    outcomes: Vec<Result<ScanData, String>>,
    calls: AtomicU32,
    retryable: bool,
}

impl ScriptedScanner {
    pub fn succeeding(data: ScanData) -> Self {
        Self {
            outcomes: vec![Ok(data)],
            calls: AtomicU32::new(0),
            retryable: true,
        }
    }

    pub fn failing(message: &str, retryable: bool) -> Self {
        Self {
            outcomes: vec![Err(message.to_string())],
            calls: AtomicU32::new(0),
            retryable,
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scanner for ScriptedScanner {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(
        &self,
        _cancel: &CancellationToken,
        _input: ScannerInput,
    ) -> Result<ScanData, AppError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        let outcome = self
            .outcomes
            .get(call)
            .unwrap_or_else(|| self.outcomes.last().expect("script not empty"));
        match outcome {
            Ok(data) => Ok(data.clone()),
            Err(message) => {
                if self.retryable {
                    Err(AppError::scanner_msg(format!("connection reset: {message}")))
                } else {
                    Err(AppError::permission(message.clone()))
                }
            }
        }
    }
}

/// Blob store that fails the first `fail_puts` uploads with a transient
/// error, then delegates to the real filesystem store.
pub struct FlakyBlobStore {
    inner: FsBlobStore,
    remaining_failures: AtomicU32,
}

impl FlakyBlobStore {
    pub fn new(root: impl Into<std::path::PathBuf>, fail_puts: u32) -> Self {
        Self {
            inner: FsBlobStore::new(root.into()),
            remaining_failures: AtomicU32::new(fail_puts),
        }
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn put(&self, path: &str, data: &[u8]) -> anyhow::Result<()> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!("connection reset by peer");
        }
        self.inner.put(path, data).await
    }

    async fn get(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        self.inner.get(path).await
    }
}

pub fn subfinder_data() -> ScanData {
    ScanData::Subfinder(SubfinderData {
        domain: "example.com".into(),
        subdomains: vec!["a.example.com".into(), "example.com".into()],
    })
}

/// Everything a lifecycle test needs in one place.
pub struct Harness {
    pub queue: Arc<InMemoryQueue>,
    pub processor: MessageProcessor,
    pub cancel: CancellationToken,
    pub blob_root: tempfile::TempDir,
}

/// Builds a processor over the in-memory queue with the given scanner under
/// the subfinder kind. `orchestrator` is a wiremock base URL; `None` disables
/// completion notifications. `store` overrides the default filesystem store.
pub fn harness(
    scanner: Arc<dyn Scanner>,
    orchestrator: Option<&str>,
    store: Option<Arc<dyn BlobStore>>,
) -> Harness {
    let blob_root = tempfile::TempDir::new().expect("tempdir");
    let store: Arc<dyn BlobStore> =
        store.unwrap_or_else(|| Arc::new(FsBlobStore::new(blob_root.path())));
    let blob = Arc::new(BlobSink::new(store, "scans"));

    let mut registry = ScannerRegistry::empty();
    registry.insert(TaskKind::Subfinder, scanner);

    let completion = orchestrator.map(|endpoint| {
        CompletionNotifier::new(endpoint, "test-key", Duration::from_secs(5))
            .expect("completion notifier")
    });

    let handler = Arc::new(TaskHandler::new(
        registry,
        blob,
        completion,
        StepNotifier::disabled(),
        Duration::from_secs(30),
    ));

    let mut config = asm_worker::Config::default();
    config.poll_interval_secs = 1;
    config.lease_renewal_interval_secs = 10;
    config.max_lease_renewal_secs = 600;
    config.enable_orchestrator_notifications = false;

    let queue = Arc::new(InMemoryQueue::new());
    let processor = MessageProcessor::new(
        Arc::clone(&queue) as Arc<dyn asm_worker::QueueConsumer>,
        handler,
        Arc::new(ProcessingStats::new()),
        &config,
    );

    Harness {
        queue,
        processor,
        cancel: CancellationToken::new(),
        blob_root,
    }
}

/// Runs the processor loop until the queue has seen `expected` finalizations
/// (or a generous deadline passes), then cancels it and waits for it to
/// return.
pub async fn drive_until_finalized(h: &Harness, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(600);
    let run = h.processor.run(&h.cancel);
    tokio::pin!(run);

    loop {
        tokio::select! {
            _ = &mut run => return,
            _ = tokio::time::sleep(Duration::from_millis(20)) => {
                let finalized = h.queue.completed().len()
                    + h.queue.abandoned().len()
                    + h.queue.dead_lettered().len();
                if finalized >= expected || tokio::time::Instant::now() > deadline {
                    h.cancel.cancel();
                }
            }
        }
    }
}

pub fn task_json(task: &str, scan_id: &str, domain: &str, instance_id: &str) -> String {
    serde_json::json!({
        "task": task,
        "scan_id": scan_id,
        "domain": domain,
        "instance_id": instance_id,
    })
    .to_string()
}
