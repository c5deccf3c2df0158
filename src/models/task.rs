//! Task-level data model: queue messages, persisted results, processing
//! outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::scanner::ScanData;

/// The kinds of scan tasks the worker can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Passive subdomain enumeration
    Subfinder,
    /// HTTP probing with technology detection
    Httpx,
    /// Bulk DNS resolution
    DnsResolve,
    /// Port scanning
    PortScan,
    /// Template-based vulnerability scanning
    Nuclei,
}

impl TaskKind {
    /// Parses a wire-format task name.
    ///
    /// `dnsx` and `naabu` are accepted as legacy aliases for `dns_resolve` and
    /// `port_scan`; the canonical names are what gets persisted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "subfinder" => Some(TaskKind::Subfinder),
            "httpx" => Some(TaskKind::Httpx),
            "dns_resolve" | "dnsx" => Some(TaskKind::DnsResolve),
            "port_scan" | "naabu" => Some(TaskKind::PortScan),
            "nuclei" => Some(TaskKind::Nuclei),
            _ => None,
        }
    }

    /// Canonical wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Subfinder => "subfinder",
            TaskKind::Httpx => "httpx",
            TaskKind::DnsResolve => "dns_resolve",
            TaskKind::PortScan => "port_scan",
            TaskKind::Nuclei => "nuclei",
        }
    }

}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task message as received from the queue.
///
/// `task` is kept as the raw string so that an unknown kind survives JSON
/// parsing and is rejected by the validator with a proper non-retryable error
/// instead of failing the parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Requested task kind (wire name)
    pub task: String,

    /// Opaque identifier of the logical scan this task belongs to
    #[serde(default)]
    pub scan_id: String,

    /// Primary target domain
    #[serde(default)]
    pub domain: String,

    /// Orchestrator correlation key; used in the completion callback URL
    #[serde(default)]
    pub instance_id: String,

    /// Location of a newline-delimited hosts/IPs artifact in the blob store.
    /// Older senders used `hosts_file_location` or `file_path`.
    #[serde(
        default,
        alias = "hosts_file_location",
        alias = "file_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_blob_path: Option<String>,

    /// Per-scanner overrides (ports, rate limits, worker counts, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
}

impl TaskMessage {
    /// Resolves the task kind, if known.
    pub fn kind(&self) -> Option<TaskKind> {
        TaskKind::parse(&self.task)
    }
}

/// Lifecycle status of a task result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task accepted, scanner running
    Running,
    /// Scanner finished and produced data
    Completed,
    /// Scanner or persistence failed
    Failed,
}

/// The persisted outcome of a task.
///
/// Created with status `Running` when the task is dispatched, mutated exactly
/// once when execution settles, and persisted exactly once on the success
/// path. `scan_id` never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Canonical task kind name
    pub task: String,

    /// Scan correlation id (opaque string)
    pub scan_id: String,

    /// Target domain
    pub domain: String,

    /// Outcome status
    pub status: TaskStatus,

    /// Scanner output; present iff the scanner succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ScanData>,

    /// Failure description; present iff status is `Failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// RFC-3339 creation timestamp
    pub timestamp: String,

    /// Elapsed wall-clock, human formatted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl TaskResult {
    /// Creates a new running result stamped with the current time.
    pub fn running(kind: TaskKind, scan_id: &str, domain: &str) -> Self {
        Self {
            task: kind.as_str().to_string(),
            scan_id: scan_id.to_string(),
            domain: domain.to_string(),
            status: TaskStatus::Running,
            data: None,
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            duration: None,
        }
    }
}

/// The outcome of processing one received message, reported up the pipeline
/// to drive retry and finalization decisions.
#[derive(Debug, Clone)]
pub struct MessageProcessingResult {
    /// Whether processing succeeded
    pub success: bool,
    /// Failure description; present iff not successful
    pub error: Option<String>,
    /// Whether the failure is transient; meaningful iff not successful
    pub retryable: bool,
    /// 0-indexed attempt at which this outcome was produced
    pub retry_count: u32,
}

impl MessageProcessingResult {
    /// A successful outcome.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            retryable: false,
            retry_count: 0,
        }
    }

    /// A failed outcome.
    pub fn failure(error: impl Into<String>, retryable: bool) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            retryable,
            retry_count: 0,
        }
    }
}
