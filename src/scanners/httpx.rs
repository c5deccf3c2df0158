//! HTTP probing via the httpx tool.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::constants::{HTTPX_PROBE_TIMEOUT_SECS, HTTPX_THREADS};
use crate::error_handling::AppError;
use crate::models::{HttpxData, HttpxHostResult, ScanData, ScannerInput};
use crate::storage::{parse_host_lines, BlobSink};

use super::process::run_tool;
use super::Scanner;

/// One probe event as emitted by `httpx -json`. Unknown fields are ignored;
/// probe failures carry `failed: true` and are skipped.
#[derive(Debug, Deserialize)]
struct HttpxRawEvent {
    #[serde(default)]
    input: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    status_code: u16,
    #[serde(default)]
    tech: Vec<String>,
    #[serde(default)]
    content_length: i64,
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    webserver: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    asn: Option<HttpxRawAsn>,
    #[serde(default)]
    failed: bool,
}

#[derive(Debug, Deserialize)]
struct HttpxRawAsn {
    #[serde(default)]
    as_number: String,
}

/// Probes a host list (or a single domain) with httpx.
pub struct HttpxScanner {
    blob: Arc<BlobSink>,
}

impl HttpxScanner {
    /// Creates the scanner with blob access for host-list inputs.
    pub fn new(blob: Arc<BlobSink>) -> Self {
        Self { blob }
    }

    fn build_args() -> Vec<String> {
        vec![
            "-json".into(),
            "-silent".into(),
            "-no-color".into(),
            "-tech-detect".into(),
            "-follow-redirects".into(),
            "-threads".into(),
            HTTPX_THREADS.to_string(),
            "-timeout".into(),
            HTTPX_PROBE_TIMEOUT_SECS.to_string(),
        ]
    }

    fn parse_events(lines: &[String]) -> Vec<HttpxHostResult> {
        let mut results = Vec::new();
        for line in lines {
            let event: HttpxRawEvent = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(e) => {
                    debug!("skipping unparsable httpx line: {e}");
                    continue;
                }
            };
            if event.failed {
                debug!("httpx probe failed for {}", event.input);
                continue;
            }
            results.push(HttpxHostResult {
                host: event.input,
                url: event.url,
                status_code: event.status_code,
                technologies: event.tech,
                content_length: event.content_length,
                content_type: event.content_type,
                web_server: event.webserver,
                title: event.title,
                asn: event.asn.map(|a| a.as_number).filter(|a| !a.is_empty()),
            });
        }
        results
    }
}

#[async_trait]
impl Scanner for HttpxScanner {
    fn name(&self) -> &'static str {
        "httpx"
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        input: ScannerInput,
    ) -> Result<ScanData, AppError> {
        let ScannerInput::Httpx(input) = input else {
            return Err(AppError::validation(
                "input",
                "invalid input type, expected httpx input",
            ));
        };
        self.validate_input(&ScannerInput::Httpx(input.clone()))?;

        info!("Starting httpx scan for domain: {}", input.domain);

        let hosts = match &input.input_path {
            Some(path) => {
                let content = self.blob.read_hosts(path).await?;
                let hosts = parse_host_lines(&content);
                debug!("Loaded {} hosts from blob storage", hosts.len());
                hosts
            }
            None => vec![input.domain.clone()],
        };

        if hosts.is_empty() {
            return Ok(ScanData::Httpx(HttpxData {
                domain: input.domain,
                results: Vec::new(),
            }));
        }

        let output = run_tool(
            cancel,
            "httpx",
            &Self::build_args(),
            Some(hosts.join("\n") + "\n"),
        )
        .await?;

        let results = Self::parse_events(&output.stdout_lines);
        info!(
            "HTTPX completed for {}: {} live hosts out of {} probed",
            input.domain,
            results.len(),
            hosts.len()
        );

        Ok(ScanData::Httpx(HttpxData {
            domain: input.domain,
            results,
        }))
    }
}
