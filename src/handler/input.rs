//! Typed scanner input construction.
//!
//! Projects `TaskMessage` fields into the scanner's input type and merges the
//! message's `config` overrides according to per-scanner rules.

use serde_json::{Map, Value};

use crate::error_handling::AppError;
use crate::models::{
    DnsxInput, HttpxInput, NaabuInput, NucleiInput, ScanProtocol, ScannerInput, SubfinderInput,
    TaskKind, TaskMessage,
};

/// Builds the typed input for `kind` from the message.
///
/// # Errors
///
/// Returns a validation error for malformed config overrides (e.g. a nuclei
/// `type` outside `http`/`non-http`).
pub fn build_scanner_input(kind: TaskKind, msg: &TaskMessage) -> Result<ScannerInput, AppError> {
    let config = msg.config.as_ref();

    match kind {
        TaskKind::Subfinder => Ok(ScannerInput::Subfinder(SubfinderInput {
            domain: msg.domain.clone(),
        })),
        TaskKind::Httpx => Ok(ScannerInput::Httpx(HttpxInput {
            domain: msg.domain.clone(),
            input_path: msg.input_blob_path.clone(),
        })),
        TaskKind::DnsResolve => Ok(ScannerInput::Dnsx(DnsxInput {
            domain: msg.domain.clone(),
            subdomains: string_list(config, "subdomains"),
            hosts_file_location: msg.input_blob_path.clone(),
            worker_count: uint(config, "worker_count").map(|v| v as usize),
            rate_limit: uint(config, "rate_limit").map(|v| v as u32),
        })),
        TaskKind::PortScan => Ok(ScannerInput::Naabu(NaabuInput {
            domain: msg.domain.clone(),
            ips: string_list(config, "ips"),
            hosts_file_location: msg.input_blob_path.clone(),
            ports: port_list(config, "ports")?,
            port_range: string(config, "port_range"),
            top_ports: string(config, "top_ports"),
            rate_limit: uint(config, "rate_limit").map(|v| v as u32),
            concurrency: uint(config, "concurrency").map(|v| v as u32),
            timeout: uint(config, "timeout"),
        })),
        TaskKind::Nuclei => {
            let scan_type = match string(config, "type") {
                None => ScanProtocol::default(),
                Some(raw) => ScanProtocol::parse(&raw).ok_or_else(|| {
                    AppError::validation("type", "type must be 'http' or 'non-http'")
                })?,
            };
            Ok(ScannerInput::Nuclei(NucleiInput {
                domain: msg.domain.clone(),
                hosts_file_location: msg.input_blob_path.clone(),
                scan_type,
            }))
        }
    }
}

fn string(config: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    config?
        .get(key)?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn uint(config: Option<&Map<String, Value>>, key: &str) -> Option<u64> {
    config?.get(key)?.as_u64()
}

fn string_list(config: Option<&Map<String, Value>>, key: &str) -> Vec<String> {
    config
        .and_then(|c| c.get(key))
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn port_list(config: Option<&Map<String, Value>>, key: &str) -> Result<Vec<u16>, AppError> {
    let Some(values) = config.and_then(|c| c.get(key)).and_then(Value::as_array) else {
        return Ok(vec![]);
    };
    values
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|port| u16::try_from(port).ok())
                .ok_or_else(|| {
                    AppError::validation("ports", format!("invalid port value: {v}"))
                })
        })
        .collect()
}
