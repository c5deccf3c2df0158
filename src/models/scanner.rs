//! Scanner input and output types.
//!
//! Inputs are tagged variants dispatched exhaustively by the registry; every
//! result type exposes the two uniform observables `count()` and `domain()`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Input for the subfinder scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubfinderInput {
    /// Domain to enumerate
    pub domain: String,
}

/// Input for the httpx scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpxInput {
    /// Domain probed when no host list is given
    pub domain: String,
    /// Blob location of a newline-delimited host list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,
}

/// Input for the DNS resolution scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsxInput {
    /// Domain resolved when no subdomain list is given
    pub domain: String,
    /// Explicit subdomains to resolve
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subdomains: Vec<String>,
    /// Blob location of a newline-delimited host list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts_file_location: Option<String>,
    /// Worker-count override for this task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_count: Option<usize>,
    /// Rate-limit override for this task (queries per second)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
}

/// Input for the port scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaabuInput {
    /// Domain the scan is attributed to
    pub domain: String,
    /// Explicit IPs to scan
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<String>,
    /// Blob location of a newline-delimited IP list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts_file_location: Option<String>,
    /// Specific ports to scan; takes priority over `port_range` and `top_ports`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,
    /// Port range, `start-end` or a comma-separated list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range: Option<String>,
    /// Top-ports preset: `full`, `100`, or `1000`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_ports: Option<String>,
    /// Packet rate limit (max 10000)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u32>,
    /// Concurrent scan threads (max 100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,
    /// Per-host timeout in seconds (max 3600)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Protocol filter for the nuclei scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScanProtocol {
    /// HTTP templates only
    #[default]
    #[serde(rename = "http")]
    Http,
    /// Everything except HTTP templates
    #[serde(rename = "non-http")]
    NonHttp,
}

impl ScanProtocol {
    /// Parses the wire name (`http` / `non-http`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "http" => Some(ScanProtocol::Http),
            "non-http" => Some(ScanProtocol::NonHttp),
            _ => None,
        }
    }
}

impl fmt::Display for ScanProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanProtocol::Http => f.write_str("http"),
            ScanProtocol::NonHttp => f.write_str("non-http"),
        }
    }
}

/// Input for the nuclei scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NucleiInput {
    /// Domain scanned when no host list is given
    pub domain: String,
    /// Blob location of a newline-delimited host list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts_file_location: Option<String>,
    /// Protocol filter
    #[serde(default, rename = "type")]
    pub scan_type: ScanProtocol,
}

/// Typed scanner input, discriminated by task kind.
#[derive(Debug, Clone)]
pub enum ScannerInput {
    /// Subdomain enumeration input
    Subfinder(SubfinderInput),
    /// HTTP probing input
    Httpx(HttpxInput),
    /// DNS resolution input
    Dnsx(DnsxInput),
    /// Port scanning input
    Naabu(NaabuInput),
    /// Vulnerability scanning input
    Nuclei(NucleiInput),
}

impl ScannerInput {
    /// The target domain this input refers to.
    pub fn domain(&self) -> &str {
        match self {
            ScannerInput::Subfinder(i) => &i.domain,
            ScannerInput::Httpx(i) => &i.domain,
            ScannerInput::Dnsx(i) => &i.domain,
            ScannerInput::Naabu(i) => &i.domain,
            ScannerInput::Nuclei(i) => &i.domain,
        }
    }

    /// Name of the scanner this input is destined for.
    pub fn scanner_name(&self) -> &'static str {
        match self {
            ScannerInput::Subfinder(_) => "subfinder",
            ScannerInput::Httpx(_) => "httpx",
            ScannerInput::Dnsx(_) => "dnsx",
            ScannerInput::Naabu(_) => "naabu",
            ScannerInput::Nuclei(_) => "nuclei",
        }
    }
}

/// Result of a subdomain enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubfinderData {
    /// Enumerated domain
    pub domain: String,
    /// Discovered subdomains, deduplicated and sorted; always includes the
    /// domain itself
    pub subdomains: Vec<String>,
}

/// Probe result for one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpxHostResult {
    /// Probed host as submitted
    pub host: String,
    /// Final URL after redirects
    #[serde(default)]
    pub url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Detected technologies
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technologies: Vec<String>,
    /// Response body length
    #[serde(default)]
    pub content_length: i64,
    /// Content-Type header value
    #[serde(default)]
    pub content_type: String,
    /// Server header value
    #[serde(default)]
    pub web_server: String,
    /// Page title
    #[serde(default)]
    pub title: String,
    /// Autonomous system, when resolvable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asn: Option<String>,
}

/// Result of an HTTP probing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpxData {
    /// Domain the probe run is attributed to
    pub domain: String,
    /// Per-host probe results
    #[serde(rename = "output")]
    pub results: Vec<HttpxHostResult>,
}

/// Resolution outcome for a single host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// At least one record was found
    Resolved,
    /// The query succeeded but returned no A/CNAME records
    NotResolved,
    /// The query failed
    Error,
}

/// DNS records for a single host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionInfo {
    /// Resolution outcome
    pub status: ResolutionStatus,
    /// A records
    #[serde(rename = "A", default, skip_serializing_if = "Vec::is_empty")]
    pub a: Vec<String>,
    /// CNAME records
    #[serde(rename = "CNAME", default, skip_serializing_if = "Vec::is_empty")]
    pub cname: Vec<String>,
}

/// Result of a bulk DNS resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsxData {
    /// Domain the resolution run is attributed to
    pub domain: String,
    /// Host to resolution mapping
    #[serde(rename = "output")]
    pub records: BTreeMap<String, ResolutionInfo>,
}

/// An open port on a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Port number
    pub port: u16,
    /// Transport protocol (tcp/udp)
    pub protocol: String,
    /// Service name, when identified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

/// Result of a port scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaabuData {
    /// Domain the scan is attributed to
    pub domain: String,
    /// IP to open-ports mapping
    #[serde(rename = "output")]
    pub ports: BTreeMap<String, Vec<PortInfo>>,
}

/// A single finding from the vulnerability scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NucleiVulnerability {
    /// Identifier of the template that matched
    pub template_id: String,
    /// Template protocol type
    #[serde(rename = "type")]
    pub kind: String,
    /// Affected host
    pub host: String,
    /// Exact location of the match
    #[serde(default)]
    pub matched_at: String,
    /// Finding name
    #[serde(default)]
    pub name: String,
    /// Finding description
    #[serde(default)]
    pub description: String,
    /// Reference links
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference: Vec<String>,
    /// Severity label
    #[serde(default)]
    pub severity: String,
}

/// Result of a vulnerability scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NucleiData {
    /// Domain the scan is attributed to
    pub domain: String,
    /// Findings
    #[serde(rename = "output")]
    pub vulnerabilities: Vec<NucleiVulnerability>,
}

/// Polymorphic scanner output, serialized as its inner shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanData {
    /// DNS resolution output
    Dnsx(DnsxData),
    /// Port scan output
    Naabu(NaabuData),
    /// Subdomain enumeration output
    Subfinder(SubfinderData),
    /// HTTP probe output
    Httpx(HttpxData),
    /// Vulnerability scan output
    Nuclei(NucleiData),
}

impl ScanData {
    /// Natural-number summary of the result: subdomains found, hosts probed,
    /// hosts resolved, open ports, or findings.
    pub fn count(&self) -> usize {
        match self {
            ScanData::Subfinder(d) => d.subdomains.len(),
            ScanData::Httpx(d) => d.results.len(),
            ScanData::Dnsx(d) => d.records.len(),
            ScanData::Naabu(d) => d.ports.values().map(Vec::len).sum(),
            ScanData::Nuclei(d) => d.vulnerabilities.len(),
        }
    }

    /// The domain this result is attributed to.
    pub fn domain(&self) -> &str {
        match self {
            ScanData::Subfinder(d) => &d.domain,
            ScanData::Httpx(d) => &d.domain,
            ScanData::Dnsx(d) => &d.domain,
            ScanData::Naabu(d) => &d.domain,
            ScanData::Nuclei(d) => &d.domain,
        }
    }
}
