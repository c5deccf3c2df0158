//! Template-based vulnerability scanning via the nuclei tool.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::constants::{
    NUCLEI_HOST_CONCURRENCY, NUCLEI_RATE_LIMIT, NUCLEI_TEMPLATE_CONCURRENCY, NUCLEI_TEMPLATES_DIR,
};
use crate::error_handling::AppError;
use crate::models::{NucleiData, NucleiVulnerability, ScanData, ScanProtocol, ScannerInput};
use crate::storage::{parse_host_lines, BlobSink};

use super::process::run_tool;
use super::Scanner;

/// One finding as emitted by `nuclei -jsonl`.
#[derive(Debug, Deserialize)]
struct NucleiRawEvent {
    #[serde(rename = "template-id", default)]
    template_id: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    host: String,
    #[serde(rename = "matched-at", default)]
    matched_at: String,
    #[serde(default)]
    info: NucleiRawInfo,
}

#[derive(Debug, Default, Deserialize)]
struct NucleiRawInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    reference: Option<Vec<String>>,
    #[serde(default)]
    severity: String,
}

/// Runs nuclei over a host list with a protocol filter.
pub struct NucleiScanner {
    blob: Arc<BlobSink>,
    templates_dir: String,
}

impl NucleiScanner {
    /// Creates the scanner with blob access for host-list inputs.
    pub fn new(blob: Arc<BlobSink>) -> Self {
        Self {
            blob,
            templates_dir: NUCLEI_TEMPLATES_DIR.to_string(),
        }
    }

    fn build_args(&self, protocol: ScanProtocol) -> Vec<String> {
        let mut args = vec![
            "-jsonl".into(),
            "-silent".into(),
            "-no-color".into(),
            "-duc".into(),
            "-t".into(),
            self.templates_dir.clone(),
            // Host-spray keeps per-host connection reuse high on wide target
            // sets
            "-ss".into(),
            "host-spray".into(),
            "-c".into(),
            NUCLEI_TEMPLATE_CONCURRENCY.to_string(),
            "-bulk-size".into(),
            NUCLEI_HOST_CONCURRENCY.to_string(),
            "-rate-limit".into(),
            NUCLEI_RATE_LIMIT.to_string(),
        ];

        match protocol {
            ScanProtocol::Http => args.extend(["-pt".into(), "http".into()]),
            ScanProtocol::NonHttp => args.extend(["-ept".into(), "http".into()]),
        }

        args
    }

    fn parse_events(lines: &[String]) -> Vec<NucleiVulnerability> {
        let mut vulnerabilities = Vec::new();
        for line in lines {
            let event: NucleiRawEvent = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(e) => {
                    debug!("skipping unparsable nuclei line: {e}");
                    continue;
                }
            };
            if event.template_id.is_empty() {
                continue;
            }
            vulnerabilities.push(NucleiVulnerability {
                template_id: event.template_id,
                kind: event.kind,
                host: event.host,
                matched_at: event.matched_at,
                name: event.info.name,
                description: event.info.description,
                reference: event.info.reference.unwrap_or_default(),
                severity: event.info.severity,
            });
        }
        vulnerabilities
    }
}

#[async_trait]
impl Scanner for NucleiScanner {
    fn name(&self) -> &'static str {
        "nuclei"
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        input: ScannerInput,
    ) -> Result<ScanData, AppError> {
        let ScannerInput::Nuclei(input) = input else {
            return Err(AppError::validation(
                "input",
                "invalid input type, expected nuclei input",
            ));
        };
        self.validate_input(&ScannerInput::Nuclei(input.clone()))?;

        info!(
            "Starting nuclei scan for domain: {} with type: {}",
            input.domain, input.scan_type
        );

        let hosts = match &input.hosts_file_location {
            Some(location) => {
                let content = self.blob.read_hosts(location).await?;
                let hosts = parse_host_lines(&content);
                debug!("Loaded {} hosts from blob storage", hosts.len());
                hosts
            }
            None => vec![input.domain.clone()],
        };

        if hosts.is_empty() {
            return Ok(ScanData::Nuclei(NucleiData {
                domain: input.domain,
                vulnerabilities: Vec::new(),
            }));
        }

        let args = self.build_args(input.scan_type);
        let output = run_tool(cancel, "nuclei", &args, Some(hosts.join("\n") + "\n")).await?;

        let vulnerabilities = Self::parse_events(&output.stdout_lines);
        info!(
            "Nuclei scan completed for {}: {} findings across {} hosts",
            input.domain,
            vulnerabilities.len(),
            hosts.len()
        );

        Ok(ScanData::Nuclei(NucleiData {
            domain: input.domain,
            vulnerabilities,
        }))
    }
}
