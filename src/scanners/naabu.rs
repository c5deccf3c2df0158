//! Port scanning via the naabu tool.

use std::collections::{BTreeMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::constants::{NAABU_MEDIUM_TARGET_SET, NAABU_SMALL_TARGET_SET};
use crate::error_handling::AppError;
use crate::models::{NaabuData, NaabuInput, PortInfo, ScanData, ScannerInput};
use crate::storage::{parse_host_lines, BlobSink};

use super::process::run_tool;
use super::Scanner;

/// One result line as emitted by `naabu -json`.
#[derive(Debug, Deserialize)]
struct NaabuRawEvent {
    #[serde(default)]
    host: String,
    #[serde(default)]
    ip: String,
    #[serde(default)]
    port: u16,
    #[serde(default)]
    protocol: Option<String>,
}

/// Rate, concurrency, per-host timeout and retries chosen by target-set size.
struct ScanProfile {
    rate: u32,
    threads: u32,
    timeout_ms: u64,
    retries: u32,
}

impl ScanProfile {
    /// Small sets get a conservative rate with generous timeouts; large sets
    /// trade per-host patience for throughput.
    fn for_target_count(count: usize) -> Self {
        if count <= NAABU_SMALL_TARGET_SET {
            Self {
                rate: 100,
                threads: 5,
                timeout_ms: 10_000,
                retries: 2,
            }
        } else if count <= NAABU_MEDIUM_TARGET_SET {
            Self {
                rate: 1000,
                threads: 25,
                timeout_ms: 5_000,
                retries: 3,
            }
        } else {
            Self {
                rate: 2000,
                threads: 50,
                timeout_ms: 3_000,
                retries: 1,
            }
        }
    }
}

/// Scans a target IP set with naabu and folds results per IP.
pub struct NaabuScanner {
    blob: Arc<BlobSink>,
}

impl NaabuScanner {
    /// Creates the scanner with blob access for IP-list inputs.
    pub fn new(blob: Arc<BlobSink>) -> Self {
        Self { blob }
    }

    /// Gathers the target set: explicit IPs first, then the hosts blob. Lines
    /// that do not parse as IPs are dropped, duplicates removed, input order
    /// kept.
    async fn collect_ips(&self, input: &NaabuInput) -> Result<Vec<String>, AppError> {
        let mut all: Vec<String> = input.ips.clone();

        if let Some(location) = &input.hosts_file_location {
            let content = self.blob.read_hosts(location).await?;
            let from_blob = parse_host_lines(&content);
            debug!("Added {} IPs from hosts file", from_blob.len());
            all.extend(from_blob);
        }

        let mut seen = HashSet::new();
        Ok(all
            .into_iter()
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .filter(|ip| ip.parse::<IpAddr>().is_ok())
            .filter(|ip| seen.insert(ip.clone()))
            .collect())
    }

    fn build_args(input: &NaabuInput, ips: &[String]) -> Vec<String> {
        let mut args = vec![
            "-json".into(),
            "-silent".into(),
            "-no-color".into(),
            "-scan-type".into(),
            "s".into(),
            "-exclude-cdn".into(),
            "-host".into(),
            ips.join(","),
        ];

        // Port selection priority: explicit list > range > top-ports preset
        if !input.ports.is_empty() {
            let ports: Vec<String> = input.ports.iter().map(|p| p.to_string()).collect();
            args.extend(["-port".into(), ports.join(",")]);
        } else if let Some(range) = &input.port_range {
            args.extend(["-port".into(), range.clone()]);
        } else if let Some(top) = &input.top_ports {
            args.extend(["-top-ports".into(), top.clone()]);
        } else {
            args.extend(["-top-ports".into(), "100".into()]);
        }

        let profile = ScanProfile::for_target_count(ips.len());
        args.extend([
            "-rate".into(),
            input.rate_limit.unwrap_or(profile.rate).to_string(),
            "-c".into(),
            input.concurrency.unwrap_or(profile.threads).to_string(),
            "-timeout".into(),
            input
                .timeout
                .map(|secs| secs * 1000)
                .unwrap_or(profile.timeout_ms)
                .to_string(),
            "-retries".into(),
            profile.retries.to_string(),
        ]);

        args
    }

    fn fold_events(lines: &[String]) -> BTreeMap<String, Vec<PortInfo>> {
        let mut ports: BTreeMap<String, Vec<PortInfo>> = BTreeMap::new();
        for line in lines {
            let event: NaabuRawEvent = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(e) => {
                    debug!("skipping unparsable naabu line: {e}");
                    continue;
                }
            };
            if event.port == 0 {
                continue;
            }
            let key = if event.ip.is_empty() {
                event.host.clone()
            } else {
                event.ip.clone()
            };
            if key.is_empty() {
                continue;
            }
            ports.entry(key).or_default().push(PortInfo {
                port: event.port,
                protocol: event.protocol.unwrap_or_else(|| "tcp".into()),
                service: None,
            });
        }
        ports
    }

    fn determine_result_domain(input: &NaabuInput, ips: &[String]) -> String {
        if !input.domain.is_empty() {
            return input.domain.clone();
        }
        if !ips.is_empty() {
            return format!("port-scan-{}-ips", ips.len());
        }
        "port-scan".into()
    }
}

#[async_trait]
impl Scanner for NaabuScanner {
    fn name(&self) -> &'static str {
        "naabu"
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        input: ScannerInput,
    ) -> Result<ScanData, AppError> {
        let ScannerInput::Naabu(input) = input else {
            return Err(AppError::validation(
                "input",
                "invalid input type, expected naabu input",
            ));
        };
        self.validate_input(&ScannerInput::Naabu(input.clone()))?;

        info!("Starting naabu scan for domain: {}", input.domain);

        let ips = self.collect_ips(&input).await?;
        if ips.is_empty() {
            return Err(AppError::validation(
                "ips",
                "no valid IPs provided for port scanning",
            ));
        }
        debug!("Scanning {} IPs", ips.len());

        let args = Self::build_args(&input, &ips);
        let output = run_tool(cancel, "naabu", &args, None).await?;
        let ports = Self::fold_events(&output.stdout_lines);

        let domain = Self::determine_result_domain(&input, &ips);
        let total: usize = ports.values().map(Vec::len).sum();
        if ports.is_empty() {
            info!("Naabu scan completed for {domain}: no open ports found");
        } else {
            info!(
                "Naabu scan completed for {domain}: {total} open ports across {} IPs",
                ports.len()
            );
        }

        Ok(ScanData::Naabu(NaabuData { domain, ports }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NaabuInput {
        NaabuInput {
            domain: "example.com".into(),
            ips: vec!["10.0.0.1".into()],
            hosts_file_location: None,
            ports: vec![],
            port_range: None,
            top_ports: None,
            rate_limit: None,
            concurrency: None,
            timeout: None,
        }
    }

    fn arg_value(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    }

    #[test]
    fn test_port_priority_explicit_list_wins() {
        let mut i = input();
        i.ports = vec![22, 80];
        i.port_range = Some("1-1000".into());
        i.top_ports = Some("1000".into());
        let args = NaabuScanner::build_args(&i, &i.ips.clone());
        assert_eq!(arg_value(&args, "-port").as_deref(), Some("22,80"));
        assert!(arg_value(&args, "-top-ports").is_none());
    }

    #[test]
    fn test_port_priority_range_over_top_ports() {
        let mut i = input();
        i.port_range = Some("1-1000".into());
        i.top_ports = Some("1000".into());
        let args = NaabuScanner::build_args(&i, &i.ips.clone());
        assert_eq!(arg_value(&args, "-port").as_deref(), Some("1-1000"));
    }

    #[test]
    fn test_port_priority_defaults_to_top_100() {
        let i = input();
        let args = NaabuScanner::build_args(&i, &i.ips.clone());
        assert_eq!(arg_value(&args, "-top-ports").as_deref(), Some("100"));
    }

    #[test]
    fn test_adaptive_profile_by_target_count() {
        let small = ScanProfile::for_target_count(3);
        assert_eq!((small.rate, small.threads, small.retries), (100, 5, 2));

        let medium = ScanProfile::for_target_count(20);
        assert_eq!((medium.rate, medium.threads, medium.retries), (1000, 25, 3));

        let large = ScanProfile::for_target_count(21);
        assert_eq!((large.rate, large.threads, large.retries), (2000, 50, 1));
    }

    #[test]
    fn test_explicit_knobs_override_profile() {
        let mut i = input();
        i.rate_limit = Some(42);
        i.concurrency = Some(7);
        i.timeout = Some(9);
        let args = NaabuScanner::build_args(&i, &i.ips.clone());
        assert_eq!(arg_value(&args, "-rate").as_deref(), Some("42"));
        assert_eq!(arg_value(&args, "-c").as_deref(), Some("7"));
        assert_eq!(arg_value(&args, "-timeout").as_deref(), Some("9000"));
    }

    #[test]
    fn test_fold_events_groups_by_ip() {
        let lines = vec![
            r#"{"host":"example.com","ip":"10.0.0.1","port":80,"protocol":"tcp"}"#.to_string(),
            r#"{"host":"example.com","ip":"10.0.0.1","port":443,"protocol":"tcp"}"#.to_string(),
            r#"{"host":"other.example.com","ip":"10.0.0.2","port":22}"#.to_string(),
            "garbage".to_string(),
        ];
        let ports = NaabuScanner::fold_events(&lines);
        assert_eq!(ports.len(), 2);
        assert_eq!(ports["10.0.0.1"].len(), 2);
        assert_eq!(ports["10.0.0.2"][0].port, 22);
        assert_eq!(ports["10.0.0.2"][0].protocol, "tcp");
    }

    #[test]
    fn test_fold_events_falls_back_to_host_key() {
        let lines = vec![r#"{"host":"example.com","port":8080}"#.to_string()];
        let ports = NaabuScanner::fold_events(&lines);
        assert_eq!(ports["example.com"][0].port, 8080);
    }

    #[test]
    fn test_determine_result_domain() {
        let i = input();
        assert_eq!(
            NaabuScanner::determine_result_domain(&i, &["10.0.0.1".into()]),
            "example.com"
        );

        let mut anon = input();
        anon.domain = String::new();
        assert_eq!(
            NaabuScanner::determine_result_domain(&anon, &["10.0.0.1".into(), "10.0.0.2".into()]),
            "port-scan-2-ips"
        );
    }
}
