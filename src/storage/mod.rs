//! Result persistence and hosts-file input reading.
//!
//! Task outputs are written to a blob store under a deterministic naming
//! scheme (`{domain}-{scan_id}/{task}/out/{uuid}.json`); hosts-file artifacts
//! referenced by task messages are read back through the same store. The
//! concrete store is behind the [`BlobStore`] trait; [`FsBlobStore`] is the
//! filesystem-rooted implementation used for local deployments and tests.
//!
//! All storage failures are surfaced as network-kind errors, which the
//! orchestrator treats as retryable.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use uuid::Uuid;

use crate::error_handling::AppError;
use crate::models::{SubfinderData, TaskResult};

/// Minimal blob-store capability set the worker needs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads a blob, overwriting any existing object at `path`.
    async fn put(&self, path: &str, data: &[u8]) -> anyhow::Result<()>;

    /// Downloads a blob.
    async fn get(&self, path: &str) -> anyhow::Result<Vec<u8>>;
}

/// Blob store rooted in a local directory.
///
/// Blob paths map directly onto filesystem paths below the root.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`. The directory is created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, path: &str, data: &[u8]) -> anyhow::Result<()> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, data).await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let full = self.root.join(path);
        Ok(tokio::fs::read(&full).await?)
    }
}

/// Persists task results and reads hosts-file inputs under a container.
pub struct BlobSink {
    store: Arc<dyn BlobStore>,
    container: String,
}

impl BlobSink {
    /// Creates a sink writing into `container` on the given store.
    pub fn new(store: Arc<dyn BlobStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }

    /// Builds the object name for a task output.
    fn object_name(domain: &str, scan_id: &str, task: &str, ext: &str) -> String {
        format!("{domain}-{scan_id}/{task}/out/{}.{ext}", Uuid::new_v4())
    }

    /// Strips a leading `{container}/` prefix.
    ///
    /// Some senders include the container in blob paths and some do not; both
    /// forms must resolve to the same object.
    fn clean_blob_path<'a>(&self, blob_path: &'a str) -> &'a str {
        blob_path
            .strip_prefix(&format!("{}/", self.container))
            .unwrap_or(blob_path)
    }

    /// Stores a task result as JSON and returns the object path.
    pub async fn store_task_result(&self, result: &TaskResult) -> Result<String, AppError> {
        let name = Self::object_name(&result.domain, &result.scan_id, &result.task, "json");
        let path = format!("{}/{}", self.container, self.clean_blob_path(&name));

        let json = serde_json::to_vec(result)
            .map_err(|e| AppError::internal("failed to serialize task result", e))?;

        self.store
            .put(&path, &json)
            .await
            .map_err(|e| AppError::network("failed to upload task result to blob storage", e))?;

        debug!("Stored task result in blob: {path}");
        Ok(path)
    }

    /// Stores the plain-text rendition of a subfinder result (one subdomain
    /// per line) and returns the object path. Downstream tooling consumes the
    /// text form directly as a hosts list.
    pub async fn store_subfinder_text(
        &self,
        data: &SubfinderData,
        scan_id: &str,
        task: &str,
    ) -> Result<String, AppError> {
        let name = Self::object_name(&data.domain, scan_id, task, "txt");
        let path = format!("{}/{}", self.container, name);
        let body = data.subdomains.join("\n");

        self.store
            .put(&path, body.as_bytes())
            .await
            .map_err(|e| {
                AppError::network("failed to upload subfinder text result to blob storage", e)
            })?;

        debug!("Stored subfinder txt result in blob: {path}");
        Ok(path)
    }

    /// Reads a hosts-file artifact and returns its content as a string.
    pub async fn read_hosts(&self, blob_path: &str) -> Result<String, AppError> {
        let clean = self.clean_blob_path(blob_path);
        let path = format!("{}/{}", self.container, clean);

        let content = self.store.get(&path).await.map_err(|e| {
            AppError::network(format!("failed to read hosts file from blob {clean}"), e)
        })?;

        debug!("Read hosts file from blob: {path} ({} bytes)", content.len());
        String::from_utf8(content)
            .map_err(|e| AppError::internal("hosts file is not valid UTF-8", e))
    }
}

/// Splits a hosts artifact into lines, trimming whitespace and skipping blank
/// lines and `#` comments.
pub fn parse_host_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskKind, TaskStatus};
    use tempfile::TempDir;

    #[test]
    fn test_parse_host_lines() {
        assert_eq!(parse_host_lines("a\n\n# x\nb"), vec!["a", "b"]);
        assert_eq!(
            parse_host_lines("  spaced  \n#comment\n\n\nlast\n"),
            vec!["spaced", "last"]
        );
        assert!(parse_host_lines("").is_empty());
        assert!(parse_host_lines("# only\n# comments\n").is_empty());
    }

    fn sink(dir: &TempDir) -> BlobSink {
        BlobSink::new(Arc::new(FsBlobStore::new(dir.path())), "scans")
    }

    #[tokio::test]
    async fn test_store_task_result_naming_scheme() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);

        let mut result = TaskResult::running(TaskKind::Subfinder, "S1", "example.com");
        result.status = TaskStatus::Completed;
        let path = sink.store_task_result(&result).await.unwrap();

        assert!(
            path.starts_with("scans/example.com-S1/subfinder/out/"),
            "{path}"
        );
        assert!(path.ends_with(".json"), "{path}");
        assert!(dir.path().join(&path).exists());
    }

    #[tokio::test]
    async fn test_stored_result_round_trips() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);

        let mut result = TaskResult::running(TaskKind::Httpx, "S2", "example.com");
        result.status = TaskStatus::Failed;
        result.error = Some("probe failed".into());
        result.duration = Some("1.5s".into());

        let path = sink.store_task_result(&result).await.unwrap();
        let bytes = tokio::fs::read(dir.path().join(&path)).await.unwrap();
        let back: TaskResult = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(back.task, "httpx");
        assert_eq!(back.scan_id, "S2");
        assert_eq!(back.status, TaskStatus::Failed);
        assert_eq!(back.error.as_deref(), Some("probe failed"));
        assert_eq!(back.duration.as_deref(), Some("1.5s"));

        // Serialize again: semantic content is stable
        let again = serde_json::to_vec(&back).unwrap();
        assert_eq!(again, bytes);
    }

    #[tokio::test]
    async fn test_read_hosts_strips_container_prefix() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);

        tokio::fs::create_dir_all(dir.path().join("scans/inputs"))
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("scans/inputs/hosts.txt"), "a\nb\n")
            .await
            .unwrap();

        // Both forms resolve to the same object
        let direct = sink.read_hosts("inputs/hosts.txt").await.unwrap();
        let prefixed = sink.read_hosts("scans/inputs/hosts.txt").await.unwrap();
        assert_eq!(direct, "a\nb\n");
        assert_eq!(prefixed, "a\nb\n");
    }

    #[tokio::test]
    async fn test_read_hosts_missing_blob_is_retryable() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);

        let err = sink.read_hosts("inputs/absent.txt").await.unwrap_err();
        assert_eq!(err.kind, crate::error_handling::ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_store_subfinder_text() {
        let dir = TempDir::new().unwrap();
        let sink = sink(&dir);

        let data = SubfinderData {
            domain: "example.com".into(),
            subdomains: vec!["a.example.com".into(), "example.com".into()],
        };
        let path = sink
            .store_subfinder_text(&data, "S1", "subfinder")
            .await
            .unwrap();
        assert!(path.ends_with(".txt"), "{path}");

        let content = tokio::fs::read_to_string(dir.path().join(&path))
            .await
            .unwrap();
        assert_eq!(content, "a.example.com\nexample.com");
    }
}
