//! asm-worker: task execution runtime for an attack surface management pipeline.
//!
//! The worker consumes scan tasks from a message queue, dispatches each task to
//! one of several pluggable scanners (subdomain enumeration, HTTP probing, DNS
//! resolution, port scanning, vulnerability scanning), persists structured
//! results to a blob store, and raises completion events towards the
//! orchestrator.
//!
//! # Example
//!
//! ```no_run
//! use asm_worker::{Application, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let app = Application::new(config).await?;
//! app.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

mod app;
pub mod config;
mod error_handling;
mod handler;
pub mod initialization;
mod models;
mod notification;
mod processing;
mod scanners;
mod storage;
mod transport;
mod utils;
mod validation;

// Re-export public API
pub use app::Application;
pub use config::{Config, LogFormat, LogLevel};
pub use error_handling::{
    classify_text, is_retryable_error, AppError, ErrorKind, InitializationError, ProcessingStats,
};
pub use handler::TaskHandler;
pub use models::{
    DnsxData, DnsxInput, HttpxData, HttpxHostResult, HttpxInput, MessageProcessingResult,
    NaabuData, NaabuInput, NucleiData, NucleiInput, NucleiVulnerability, PortInfo,
    ResolutionInfo, ResolutionStatus, ScanData, ScanProtocol, ScannerInput, SubfinderData,
    SubfinderInput, TaskKind, TaskMessage, TaskResult, TaskStatus,
};
pub use notification::{CompletionNotifier, NotificationStep, StepNotifier};
pub use processing::MessageProcessor;
pub use scanners::{
    DnsRecords, DnsxScanner, HostResolver, HttpxScanner, NaabuScanner, NucleiScanner, PoolConfig,
    Scanner, ScannerRegistry, SubfinderScanner,
};
pub use storage::{parse_host_lines, BlobSink, BlobStore, FsBlobStore};
pub use transport::{
    InMemoryQueue, QueueConsumer, ReceivedMessage, DEAD_LETTER_INVALID_FORMAT,
    DEAD_LETTER_PROCESSING_FAILED, PROPERTY_LAST_ERROR, PROPERTY_RETRY_COUNT,
};
pub use validation::{validate_domain, validate_scanner_input, validate_task_message};
