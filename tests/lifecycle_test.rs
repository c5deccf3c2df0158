//! End-to-end lifecycle tests over the in-memory queue: receive, process,
//! and finalize with exactly one of complete/abandon/dead-letter.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use asm_worker::{AppError, ScanData, Scanner, ScannerInput, TaskResult, TaskStatus};
use helpers::{
    drive_until_finalized, harness, subfinder_data, task_json, FlakyBlobStore, ScriptedScanner,
};

#[tokio::test]
async fn subfinder_happy_path_persists_notifies_and_completes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/instances/I1/raiseEvent/subfinder_completed"))
        .and(query_param("code", "test-key"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let scanner = Arc::new(ScriptedScanner::succeeding(subfinder_data()));
    let h = harness(scanner.clone(), Some(&server.uri()), None);

    h.queue.push(task_json("subfinder", "S1", "example.com", "I1"));
    drive_until_finalized(&h, 1).await;

    // Message completed, nothing else
    assert_eq!(h.queue.completed().len(), 1);
    assert!(h.queue.abandoned().is_empty());
    assert!(h.queue.dead_lettered().is_empty());
    assert_eq!(scanner.calls(), 1);

    // Result blob at the deterministic prefix, with completed status and both
    // subdomains
    let out_dir = h
        .blob_root
        .path()
        .join("scans/example.com-S1/subfinder/out");
    let mut json_files = 0;
    let mut txt_files = 0;
    for entry in std::fs::read_dir(&out_dir).unwrap() {
        let path = entry.unwrap().path();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                json_files += 1;
                let stored: TaskResult =
                    serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
                assert_eq!(stored.status, TaskStatus::Completed);
                assert_eq!(stored.scan_id, "S1");
                let Some(ScanData::Subfinder(data)) = stored.data else {
                    panic!("expected subfinder data");
                };
                assert!(data.subdomains.contains(&"example.com".to_string()));
                assert!(data.subdomains.contains(&"a.example.com".to_string()));
            }
            Some("txt") => txt_files += 1,
            _ => {}
        }
    }
    assert_eq!(json_files, 1);
    assert_eq!(txt_files, 1);

    // wiremock verifies the expected POST on drop
}

#[tokio::test]
async fn unknown_task_dead_letters_without_side_effects() {
    let server = MockServer::start().await;
    // No expectations mounted: any request would 404 and fail the count check
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let scanner = Arc::new(ScriptedScanner::succeeding(subfinder_data()));
    let h = harness(scanner.clone(), Some(&server.uri()), None);

    h.queue
        .push(task_json("unknown_xyz", "S1", "example.com", "I1"));
    drive_until_finalized(&h, 1).await;

    let dead = h.queue.dead_lettered();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].1, "ProcessingFailed");
    assert!(dead[0].2.contains("unknown task type"), "{}", dead[0].2);
    // Single attempt: non-retryable
    assert!(dead[0].2.starts_with("Failed after 1 attempts"), "{}", dead[0].2);

    assert!(h.queue.completed().is_empty());
    assert!(h.queue.abandoned().is_empty());
    assert_eq!(scanner.calls(), 0);
    // No blob written
    assert!(!h.blob_root.path().join("scans").exists());
}

#[tokio::test]
async fn malformed_json_dead_letters_immediately() {
    let scanner = Arc::new(ScriptedScanner::succeeding(subfinder_data()));
    let h = harness(scanner.clone(), None, None);

    h.queue.push("not json");
    drive_until_finalized(&h, 1).await;

    let dead = h.queue.dead_lettered();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].1, "InvalidMessageFormat");
    assert!(dead[0].2.contains("failed to parse message as JSON"));

    // The retry engine never ran: no scanner call, no renewals
    assert_eq!(scanner.calls(), 0);
    assert_eq!(h.queue.renewal_count(), 0);
}

#[tokio::test]
async fn persistence_flake_then_success_completes_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/instances/I9/raiseEvent/subfinder_completed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let blob_root = tempfile::TempDir::new().unwrap();
    let flaky = Arc::new(FlakyBlobStore::new(blob_root.path(), 1));

    let scanner = Arc::new(ScriptedScanner::succeeding(subfinder_data()));
    let h = harness(scanner.clone(), Some(&server.uri()), Some(flaky));

    h.queue.push(task_json("subfinder", "S9", "example.com", "I9"));
    drive_until_finalized(&h, 1).await;

    assert_eq!(h.queue.completed().len(), 1);
    assert!(h.queue.abandoned().is_empty());
    assert!(h.queue.dead_lettered().is_empty());
    // First attempt hit the flaky store, second went through
    assert_eq!(scanner.calls(), 2);

    // Exactly one result json (the failed upload wrote nothing)
    let out_dir = blob_root.path().join("scans/example.com-S9/subfinder/out");
    let json_count = std::fs::read_dir(&out_dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
        .count();
    assert_eq!(json_count, 1);
}

#[tokio::test(start_paused = true)]
async fn retryable_failure_exhausts_attempts_then_abandons() {
    let scanner = Arc::new(ScriptedScanner::failing("upstream flapping", true));
    let h = harness(scanner.clone(), None, None);

    h.queue.push(task_json("subfinder", "S2", "example.com", "I2"));
    drive_until_finalized(&h, 1).await;

    // All in-process attempts burned, still retryable: back to the broker
    let abandoned = h.queue.abandoned();
    assert_eq!(abandoned.len(), 1);
    assert_eq!(scanner.calls(), 3);
    assert_eq!(abandoned[0].1.get("retry_count").map(String::as_str), Some("3"));
    assert!(abandoned[0].1.get("last_error").unwrap().contains("connection reset"));

    assert!(h.queue.completed().is_empty());
    assert!(h.queue.dead_lettered().is_empty());
}

#[tokio::test]
async fn non_retryable_failure_dead_letters_after_single_attempt() {
    let scanner = Arc::new(ScriptedScanner::failing("credentials rejected", false));
    let h = harness(scanner.clone(), None, None);

    h.queue.push(task_json("subfinder", "S3", "example.com", "I3"));
    drive_until_finalized(&h, 1).await;

    let dead = h.queue.dead_lettered();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].1, "ProcessingFailed");
    assert_eq!(scanner.calls(), 1);
    assert!(h.queue.abandoned().is_empty());
}

#[tokio::test]
async fn each_receipt_gets_exactly_one_finalization() {
    let scanner = Arc::new(ScriptedScanner::succeeding(subfinder_data()));
    let h = harness(scanner, None, None);

    for i in 0..3 {
        h.queue
            .push(task_json("subfinder", &format!("S{i}"), "example.com", "I1"));
    }
    h.queue.push("garbage");
    drive_until_finalized(&h, 4).await;

    let total =
        h.queue.completed().len() + h.queue.abandoned().len() + h.queue.dead_lettered().len();
    assert_eq!(total, 4);
    assert_eq!(h.queue.completed().len(), 3);
    assert_eq!(h.queue.dead_lettered().len(), 1);
}

/// Scanner that parks until its token fires, mimicking a long scan that dies
/// with the lease.
struct HangUntilCancelled;

#[async_trait]
impl Scanner for HangUntilCancelled {
    fn name(&self) -> &'static str {
        "hang"
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        _input: ScannerInput,
    ) -> Result<ScanData, AppError> {
        cancel.cancelled().await;
        Err(AppError::timeout("scan cancelled"))
    }
}

#[tokio::test(start_paused = true)]
async fn lease_renewal_loss_cancels_attempt_and_abandons() {
    let h = harness(Arc::new(HangUntilCancelled), None, None);

    // The immediate renewal of the first attempt succeeds; every renewal
    // after it fails, so each attempt dies at its first ticker renewal
    h.queue.fail_renewals_after(1);

    h.queue.push(task_json("subfinder", "S4", "example.com", "I4"));
    drive_until_finalized(&h, 1).await;

    let abandoned = h.queue.abandoned();
    assert_eq!(abandoned.len(), 1, "lease loss must abandon, not dead-letter");
    assert!(abandoned[0]
        .1
        .get("last_error")
        .unwrap()
        .contains("lease renewal failed"));

    assert!(h.queue.dead_lettered().is_empty());
    assert!(h.queue.completed().is_empty());
    // One immediate renewal per attempt plus the failing tick renewals
    assert!(h.queue.renewal_count() >= 3, "{}", h.queue.renewal_count());
}
