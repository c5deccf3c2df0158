//! Bulk DNS resolution scanner.
//!
//! Unlike the other scanners this one runs in-process: a worker pool fans the
//! host list out over a shared resolver with a global rate limit, and a
//! sharded map aggregates results.

mod pool;
mod resolver;
mod sharded;

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::error_handling::AppError;
use crate::models::{DnsxData, DnsxInput, ScanData, ScannerInput};
use crate::storage::{parse_host_lines, BlobSink};

pub use pool::PoolConfig;
pub use resolver::{DnsRecords, HostResolver};

use resolver::HickoryHostResolver;

use super::Scanner;

/// Bulk DNS resolution over a worker pool.
pub struct DnsxScanner {
    blob: Arc<BlobSink>,
    defaults: PoolConfig,
    /// Shared resolver, created once on first execution
    resolver: OnceCell<Arc<dyn HostResolver>>,
    /// Injected resolver; bypasses lazy initialization
    injected: Option<Arc<dyn HostResolver>>,
}

impl DnsxScanner {
    /// Creates the scanner with blob access and the configured pool defaults.
    pub fn new(blob: Arc<BlobSink>, defaults: PoolConfig) -> Self {
        Self {
            blob,
            defaults,
            resolver: OnceCell::new(),
            injected: None,
        }
    }

    /// Creates the scanner with a caller-supplied resolver instead of the
    /// shared hickory one. Used by tests and embedders.
    pub fn with_resolver(
        blob: Arc<BlobSink>,
        defaults: PoolConfig,
        resolver: Arc<dyn HostResolver>,
    ) -> Self {
        Self {
            blob,
            defaults,
            resolver: OnceCell::new(),
            injected: Some(resolver),
        }
    }

    async fn resolver(&self) -> Result<Arc<dyn HostResolver>, AppError> {
        if let Some(resolver) = &self.injected {
            return Ok(Arc::clone(resolver));
        }
        let resolver = self
            .resolver
            .get_or_try_init(|| async {
                HickoryHostResolver::new().map(|r| Arc::new(r) as Arc<dyn HostResolver>)
            })
            .await
            .map_err(|e| AppError::scanner("failed to create DNS client", e))?;
        Ok(Arc::clone(resolver))
    }

    /// Assembles the host list: explicit subdomains, then the hosts blob,
    /// then the bare domain as a fallback.
    async fn collect_hosts(&self, input: &DnsxInput) -> Result<Vec<String>, AppError> {
        let mut hosts: Vec<String> = input.subdomains.clone();
        if !hosts.is_empty() {
            info!("Added {} subdomains from input", hosts.len());
        }

        if let Some(location) = &input.hosts_file_location {
            let content = self.blob.read_hosts(location).await?;
            let from_blob = parse_host_lines(&content);
            info!("Added {} subdomains from hosts file", from_blob.len());
            hosts.extend(from_blob);
        }

        if hosts.is_empty() {
            if input.domain.is_empty() {
                return Err(AppError::validation(
                    "domain",
                    "no domain or subdomains provided for DNS resolution",
                ));
            }
            info!("No subdomains found, resolving single domain: {}", input.domain);
            hosts.push(input.domain.clone());
        }

        Ok(hosts)
    }

    fn pool_config(&self, input: &DnsxInput) -> PoolConfig {
        PoolConfig {
            worker_count: input.worker_count.unwrap_or(self.defaults.worker_count),
            rate_limit: input.rate_limit.unwrap_or(self.defaults.rate_limit),
            shard_count: self.defaults.shard_count,
        }
    }

    fn determine_result_domain(input: &DnsxInput, hosts: &[String]) -> String {
        if !input.domain.is_empty() {
            return input.domain.clone();
        }
        hosts.first().map(|h| h.trim().to_string()).unwrap_or_default()
    }
}

#[async_trait]
impl Scanner for DnsxScanner {
    fn name(&self) -> &'static str {
        "dnsx"
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        input: ScannerInput,
    ) -> Result<ScanData, AppError> {
        let ScannerInput::Dnsx(input) = input else {
            return Err(AppError::validation(
                "input",
                "invalid input type, expected dnsx input",
            ));
        };
        self.validate_input(&ScannerInput::Dnsx(input.clone()))?;

        info!(
            "DNSX starting with domain: {}, subdomains count: {}, hosts file: {}",
            input.domain,
            input.subdomains.len(),
            input.hosts_file_location.as_deref().unwrap_or("-")
        );

        let resolver = self.resolver().await?;
        let hosts = self.collect_hosts(&input).await?;
        let config = self.pool_config(&input);

        let records = pool::resolve_all(cancel, resolver, &config, hosts.clone()).await;
        if cancel.is_cancelled() {
            return Err(AppError::timeout("DNS resolution cancelled"));
        }

        let domain = Self::determine_result_domain(&input, &hosts);
        info!(
            "DNSX completed for domain {domain}: processed {} hosts, {} records",
            hosts.len(),
            records.len()
        );

        Ok(ScanData::Dnsx(DnsxData { domain, records }))
    }
}
