//! Structural validation of task messages and scanner inputs.
//!
//! Everything here fails with [`ErrorKind::Validation`](crate::ErrorKind)
//! errors, which are never retried: a malformed input stays malformed no
//! matter how often it is resubmitted.

use std::net::IpAddr;

use crate::error_handling::AppError;
use crate::models::{DnsxInput, HttpxInput, NaabuInput, NucleiInput, ScannerInput, TaskMessage};

/// Maximum length of a DNS name.
const MAX_DOMAIN_LEN: usize = 253;

/// Label sequences that never occur in a well-formed domain.
const INVALID_DOMAIN_PATTERNS: &[&str] = &["..", ".-", "-."];

/// Validates a domain name.
///
/// Deliberately permissive rather than a full RFC 1123 grammar: non-empty,
/// at most 253 characters, no `..`/`.-`/`-.` sequences, first and last
/// characters alphanumeric.
pub fn validate_domain(domain: &str) -> Result<(), AppError> {
    if domain.is_empty() {
        return Err(AppError::validation("domain", "domain is required"));
    }

    if domain.len() > MAX_DOMAIN_LEN {
        return Err(AppError::validation(
            "domain",
            format!("invalid domain: too long ({} chars): {domain}", domain.len()),
        ));
    }

    for pattern in INVALID_DOMAIN_PATTERNS {
        if domain.contains(pattern) {
            return Err(AppError::validation(
                "domain",
                format!("invalid domain: contains '{pattern}': {domain}"),
            ));
        }
    }

    let first = domain.chars().next().unwrap();
    let last = domain.chars().last().unwrap();
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(AppError::validation(
            "domain",
            format!("invalid domain: must start and end with an alphanumeric character: {domain}"),
        ));
    }

    Ok(())
}

/// Validates a task message received from the queue.
///
/// Checks the domain, the scan id, and that the task kind is known. Unknown
/// kinds are a hard validation failure; there is no fallback scanner.
pub fn validate_task_message(msg: &TaskMessage) -> Result<(), AppError> {
    if msg.domain.is_empty() {
        return Err(AppError::validation(
            "domain",
            "domain is required for task processing",
        ));
    }
    validate_domain(&msg.domain)?;

    if msg.scan_id.is_empty() {
        return Err(AppError::validation("scan_id", "scan_id is required"));
    }

    if msg.task.is_empty() {
        return Err(AppError::validation("task", "task type is required"));
    }
    if msg.kind().is_none() {
        return Err(AppError::validation(
            "task",
            format!("unknown task type: {}", msg.task),
        ));
    }

    Ok(())
}

/// Validates a typed scanner input, dispatching to the per-scanner rules.
pub fn validate_scanner_input(input: &ScannerInput) -> Result<(), AppError> {
    match input {
        ScannerInput::Subfinder(i) => validate_domain(&i.domain),
        ScannerInput::Httpx(i) => validate_httpx_input(i),
        ScannerInput::Dnsx(i) => validate_dnsx_input(i),
        ScannerInput::Naabu(i) => validate_naabu_input(i),
        ScannerInput::Nuclei(i) => validate_nuclei_input(i),
    }
}

fn validate_httpx_input(input: &HttpxInput) -> Result<(), AppError> {
    if input.domain.is_empty() && input.input_path.is_none() {
        return Err(AppError::validation(
            "domain",
            "either a domain or an input host list must be provided for httpx",
        ));
    }
    if !input.domain.is_empty() {
        validate_domain(&input.domain)?;
    }
    Ok(())
}

fn validate_dnsx_input(input: &DnsxInput) -> Result<(), AppError> {
    if input.domain.is_empty() && input.subdomains.is_empty() {
        return Err(AppError::validation(
            "domain",
            "either domain or subdomains must be provided for DNS resolution",
        ));
    }

    if !input.domain.is_empty() {
        validate_domain(&input.domain)?;
    }

    for (i, subdomain) in input.subdomains.iter().enumerate() {
        if subdomain.is_empty() {
            continue;
        }
        validate_domain(subdomain).map_err(|e| {
            AppError::validation(format!("subdomains[{i}]"), e.message)
        })?;
    }

    Ok(())
}

fn validate_naabu_input(input: &NaabuInput) -> Result<(), AppError> {
    validate_domain(&input.domain)?;

    for (i, ip) in input.ips.iter().enumerate() {
        if ip.parse::<IpAddr>().is_err() {
            return Err(AppError::validation(
                format!("ips[{i}]"),
                format!("invalid IP address: {ip}"),
            ));
        }
    }

    for (i, port) in input.ports.iter().enumerate() {
        if *port < 1 {
            return Err(AppError::validation(
                format!("ports[{i}]"),
                format!("port must be between 1 and 65535, got: {port}"),
            ));
        }
    }

    if let Some(range) = &input.port_range {
        validate_port_range(range)?;
    }

    if let Some(top) = &input.top_ports {
        if !matches!(top.as_str(), "full" | "100" | "1000") {
            return Err(AppError::validation(
                "top_ports",
                "top_ports must be one of: 'full', '100', '1000'",
            ));
        }
    }

    if let Some(rate) = input.rate_limit {
        if rate > 10_000 {
            return Err(AppError::validation(
                "rate_limit",
                "rate limit cannot exceed 10000 packets per second",
            ));
        }
    }

    if let Some(concurrency) = input.concurrency {
        if concurrency > 100 {
            return Err(AppError::validation(
                "concurrency",
                "concurrency cannot exceed 100",
            ));
        }
    }

    if let Some(timeout) = input.timeout {
        if timeout > 3600 {
            return Err(AppError::validation(
                "timeout",
                "timeout cannot exceed 3600 seconds",
            ));
        }
    }

    if input.ips.is_empty() && input.hosts_file_location.is_none() {
        return Err(AppError::validation(
            "ips",
            "either IPs or a hosts file location must be provided",
        ));
    }

    Ok(())
}

/// Validates a port range expression.
///
/// Accepts `start-end` with `1 <= start < end <= 65535`, or a comma-separated
/// list of valid ports.
fn validate_port_range(range: &str) -> Result<(), AppError> {
    let range = range.trim();
    if range.is_empty() {
        return Err(AppError::validation(
            "port_range",
            "port range cannot be empty",
        ));
    }

    if let Some((start, end)) = range.split_once('-') {
        let start: u32 = start.trim().parse().map_err(|_| {
            AppError::validation("port_range", format!("invalid port range start: {range}"))
        })?;
        let end: u32 = end.trim().parse().map_err(|_| {
            AppError::validation("port_range", format!("invalid port range end: {range}"))
        })?;
        if start < 1 || end > 65_535 || start >= end {
            return Err(AppError::validation(
                "port_range",
                format!("port range must satisfy 1 <= start < end <= 65535: {range}"),
            ));
        }
        return Ok(());
    }

    for part in range.split(',') {
        let port: u32 = part.trim().parse().map_err(|_| {
            AppError::validation("port_range", format!("invalid port in list: {part}"))
        })?;
        if !(1..=65_535).contains(&port) {
            return Err(AppError::validation(
                "port_range",
                format!("port must be between 1 and 65535, got: {port}"),
            ));
        }
    }

    Ok(())
}

fn validate_nuclei_input(input: &NucleiInput) -> Result<(), AppError> {
    if input.domain.is_empty() && input.hosts_file_location.is_none() {
        return Err(AppError::validation(
            "domain",
            "either a domain or a hosts file location must be provided for nuclei",
        ));
    }
    if !input.domain.is_empty() {
        validate_domain(&input.domain)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanProtocol;

    #[test]
    fn test_validate_domain_accepts_normal_domains() {
        for domain in ["example.com", "a.b.c.example.co.uk", "xn--bcher-kva.example", "1.2.3.4"] {
            assert!(validate_domain(domain).is_ok(), "{domain}");
        }
    }

    #[test]
    fn test_validate_domain_rejects_empty() {
        assert!(validate_domain("").is_err());
    }

    #[test]
    fn test_validate_domain_rejects_overlong() {
        let label = "a".repeat(60);
        let domain = format!("{label}.{label}.{label}.{label}.com");
        assert_eq!(domain.len(), 247);
        assert!(validate_domain(&domain).is_ok());
        let longer = format!("{domain}.longer1");
        assert!(longer.len() > 253);
        assert!(validate_domain(&longer).is_err());

        // Exactly 254 characters
        let exact = format!("{}.com", "a".repeat(250));
        assert_eq!(exact.len(), 254);
        assert!(validate_domain(&exact).is_err());
    }

    #[test]
    fn test_validate_domain_rejects_invalid_patterns() {
        assert!(validate_domain("a..example.com").is_err());
        assert!(validate_domain("a.-example.com").is_err());
        assert!(validate_domain("a-.example.com").is_err());
    }

    #[test]
    fn test_validate_domain_rejects_bad_edges() {
        assert!(validate_domain("-example.com").is_err());
        assert!(validate_domain("example.com-").is_err());
        assert!(validate_domain(".example.com").is_err());
        assert!(validate_domain("example.com.").is_err());
    }

    fn message(task: &str) -> TaskMessage {
        TaskMessage {
            task: task.to_string(),
            scan_id: "scan-1".to_string(),
            domain: "example.com".to_string(),
            instance_id: "inst-1".to_string(),
            input_blob_path: None,
            config: None,
        }
    }

    #[test]
    fn test_validate_task_message_ok() {
        assert!(validate_task_message(&message("subfinder")).is_ok());
        assert!(validate_task_message(&message("dnsx")).is_ok());
    }

    #[test]
    fn test_validate_task_message_unknown_task() {
        let err = validate_task_message(&message("unknown_xyz")).unwrap_err();
        assert!(err.to_string().contains("unknown task type"));
        assert!(!crate::error_handling::is_retryable_error(&err));
    }

    #[test]
    fn test_validate_task_message_missing_fields() {
        let mut msg = message("subfinder");
        msg.domain = String::new();
        assert!(validate_task_message(&msg).is_err());

        let mut msg = message("subfinder");
        msg.scan_id = String::new();
        assert!(validate_task_message(&msg).is_err());

        let msg = message("");
        assert!(validate_task_message(&msg).is_err());
    }

    fn naabu_input() -> NaabuInput {
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

    #[test]
    fn test_naabu_validates_ips() {
        let mut input = naabu_input();
        input.ips = vec!["10.0.0.1".into(), "::1".into()];
        assert!(validate_scanner_input(&ScannerInput::Naabu(input)).is_ok());

        let mut input = naabu_input();
        input.ips = vec!["999.0.0.1".into()];
        assert!(validate_scanner_input(&ScannerInput::Naabu(input)).is_err());
    }

    #[test]
    fn test_naabu_rejects_port_zero() {
        let mut input = naabu_input();
        input.ports = vec![0];
        assert!(validate_scanner_input(&ScannerInput::Naabu(input)).is_err());
    }

    #[test]
    fn test_naabu_port_range_grammar() {
        for ok in ["1-1000", "80,443,8080", "1-65535", " 22 , 80 "] {
            let mut input = naabu_input();
            input.port_range = Some(ok.into());
            assert!(
                validate_scanner_input(&ScannerInput::Naabu(input)).is_ok(),
                "{ok}"
            );
        }
        for bad in ["", "1000-1", "80-80", "0-100", "1-65536", "80,,443", "abc"] {
            let mut input = naabu_input();
            input.port_range = Some(bad.into());
            assert!(
                validate_scanner_input(&ScannerInput::Naabu(input)).is_err(),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_naabu_top_ports_values() {
        for ok in ["full", "100", "1000"] {
            let mut input = naabu_input();
            input.top_ports = Some(ok.into());
            assert!(validate_scanner_input(&ScannerInput::Naabu(input)).is_ok());
        }
        let mut input = naabu_input();
        input.top_ports = Some("5000".into());
        assert!(validate_scanner_input(&ScannerInput::Naabu(input)).is_err());
    }

    #[test]
    fn test_naabu_limits() {
        let mut input = naabu_input();
        input.rate_limit = Some(10_001);
        assert!(validate_scanner_input(&ScannerInput::Naabu(input)).is_err());

        let mut input = naabu_input();
        input.concurrency = Some(101);
        assert!(validate_scanner_input(&ScannerInput::Naabu(input)).is_err());

        let mut input = naabu_input();
        input.timeout = Some(3601);
        assert!(validate_scanner_input(&ScannerInput::Naabu(input)).is_err());
    }

    #[test]
    fn test_naabu_requires_targets() {
        let mut input = naabu_input();
        input.ips = vec![];
        assert!(validate_scanner_input(&ScannerInput::Naabu(input.clone())).is_err());

        input.hosts_file_location = Some("scans/ips.txt".into());
        assert!(validate_scanner_input(&ScannerInput::Naabu(input)).is_ok());
    }

    #[test]
    fn test_dnsx_requires_domain_or_subdomains() {
        let input = DnsxInput {
            domain: String::new(),
            subdomains: vec![],
            hosts_file_location: None,
            worker_count: None,
            rate_limit: None,
        };
        assert!(validate_scanner_input(&ScannerInput::Dnsx(input)).is_err());

        let input = DnsxInput {
            domain: String::new(),
            subdomains: vec!["a.example.com".into()],
            hosts_file_location: None,
            worker_count: None,
            rate_limit: None,
        };
        assert!(validate_scanner_input(&ScannerInput::Dnsx(input)).is_ok());
    }

    #[test]
    fn test_dnsx_skips_empty_subdomains_but_checks_others() {
        let input = DnsxInput {
            domain: "example.com".into(),
            subdomains: vec![String::new(), "ok.example.com".into()],
            hosts_file_location: None,
            worker_count: None,
            rate_limit: None,
        };
        assert!(validate_scanner_input(&ScannerInput::Dnsx(input)).is_ok());

        let input = DnsxInput {
            domain: "example.com".into(),
            subdomains: vec!["bad..example.com".into()],
            hosts_file_location: None,
            worker_count: None,
            rate_limit: None,
        };
        let err = validate_scanner_input(&ScannerInput::Dnsx(input)).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("subdomains[0]"));
    }

    #[test]
    fn test_httpx_requires_domain_or_list() {
        let input = HttpxInput {
            domain: String::new(),
            input_path: None,
        };
        assert!(validate_scanner_input(&ScannerInput::Httpx(input)).is_err());

        let input = HttpxInput {
            domain: String::new(),
            input_path: Some("scans/hosts.txt".into()),
        };
        assert!(validate_scanner_input(&ScannerInput::Httpx(input)).is_ok());
    }

    #[test]
    fn test_nuclei_input() {
        let input = NucleiInput {
            domain: "example.com".into(),
            hosts_file_location: None,
            scan_type: ScanProtocol::Http,
        };
        assert!(validate_scanner_input(&ScannerInput::Nuclei(input)).is_ok());

        let input = NucleiInput {
            domain: String::new(),
            hosts_file_location: None,
            scan_type: ScanProtocol::NonHttp,
        };
        assert!(validate_scanner_input(&ScannerInput::Nuclei(input)).is_err());
    }
}
