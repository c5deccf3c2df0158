//! Scanner contract and registry.
//!
//! Each task kind maps to exactly one scanner. A scanner validates its typed
//! input, executes under a cancellation token, and returns a typed result.
//! Lookup misses are non-retryable validation errors; there is no fallback
//! scanner.

mod dnsx;
mod httpx;
mod naabu;
mod nuclei;
mod process;
mod subfinder;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error_handling::AppError;
use crate::models::{ScanData, ScannerInput, TaskKind};
use crate::storage::BlobSink;

pub use dnsx::{DnsRecords, DnsxScanner, HostResolver, PoolConfig};
pub use httpx::HttpxScanner;
pub use naabu::NaabuScanner;
pub use nuclei::NucleiScanner;
pub use subfinder::SubfinderScanner;

/// A security scanner the worker can dispatch tasks to.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Scanner name, used in logs and step notifications.
    fn name(&self) -> &'static str;

    /// Validates the typed input for this scanner.
    fn validate_input(&self, input: &ScannerInput) -> Result<(), AppError> {
        crate::validation::validate_scanner_input(input)
    }

    /// Runs the scan. Implementations observe `cancel` at every suspension
    /// point and return promptly once it fires.
    async fn execute(
        &self,
        cancel: &CancellationToken,
        input: ScannerInput,
    ) -> Result<ScanData, AppError>;
}

impl std::fmt::Debug for dyn Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Scanner").field(&self.name()).finish()
    }
}

/// Maps task kinds to scanner instances; built once at process start.
pub struct ScannerRegistry {
    scanners: HashMap<TaskKind, Arc<dyn Scanner>>,
}

impl ScannerRegistry {
    /// Builds the registry with all production scanners wired to the blob
    /// sink and the configured DNS pool defaults.
    pub fn new(blob: Arc<BlobSink>, config: &Config) -> Self {
        let mut scanners: HashMap<TaskKind, Arc<dyn Scanner>> = HashMap::new();
        scanners.insert(TaskKind::Subfinder, Arc::new(SubfinderScanner::new()));
        scanners.insert(TaskKind::Httpx, Arc::new(HttpxScanner::new(Arc::clone(&blob))));
        scanners.insert(
            TaskKind::DnsResolve,
            Arc::new(DnsxScanner::new(
                Arc::clone(&blob),
                PoolConfig {
                    worker_count: config.dns_worker_count,
                    rate_limit: config.dns_rate_limit,
                    shard_count: config.dns_shard_count,
                },
            )),
        );
        scanners.insert(TaskKind::PortScan, Arc::new(NaabuScanner::new(Arc::clone(&blob))));
        scanners.insert(TaskKind::Nuclei, Arc::new(NucleiScanner::new(blob)));
        Self { scanners }
    }

    /// Creates an empty registry; scanners are added with
    /// [`ScannerRegistry::insert`]. Intended for tests and embedders.
    pub fn empty() -> Self {
        Self {
            scanners: HashMap::new(),
        }
    }

    /// Registers (or replaces) the scanner for a task kind.
    pub fn insert(&mut self, kind: TaskKind, scanner: Arc<dyn Scanner>) {
        self.scanners.insert(kind, scanner);
    }

    /// Looks up the scanner for a task kind.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable validation error for unknown kinds. Falling
    /// back to a default scanner here would silently run the wrong tool.
    pub fn get(&self, kind: TaskKind) -> Result<Arc<dyn Scanner>, AppError> {
        self.scanners.get(&kind).cloned().ok_or_else(|| {
            AppError::validation("task", format!("unknown task type: no scanner registered for {kind}"))
        })
    }

    /// Names of all registered scanners.
    pub fn available(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.scanners.values().map(|s| s.name()).collect();
        names.sort_unstable();
        names
    }
}
