//! Passive subdomain enumeration via the subfinder tool.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use log::info;
use tokio_util::sync::CancellationToken;

use crate::config::constants::{SUBFINDER_ENUMERATION_SECS, SUBFINDER_HARD_TIMEOUT};
use crate::error_handling::AppError;
use crate::models::{ScanData, ScannerInput, SubfinderData};

use super::process::run_tool;
use super::Scanner;

/// Runs `subfinder` against a single domain and shapes its line output.
pub struct SubfinderScanner {
    hard_timeout: Duration,
}

impl SubfinderScanner {
    /// Creates the scanner with the default hard timeout.
    pub fn new() -> Self {
        Self {
            hard_timeout: SUBFINDER_HARD_TIMEOUT,
        }
    }

    fn build_args(domain: &str) -> Vec<String> {
        vec![
            "-d".into(),
            domain.into(),
            "-silent".into(),
            "-all".into(),
            "-timeout".into(),
            SUBFINDER_ENUMERATION_SECS.to_string(),
        ]
    }

    /// Trims, deduplicates and sorts raw enumerator output, making sure the
    /// enumerated domain itself is part of the list.
    fn shape_output(domain: &str, lines: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut subdomains: Vec<String> = lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .filter(|line| seen.insert(line.to_string()))
            .map(str::to_string)
            .collect();

        if !seen.contains(domain) {
            subdomains.push(domain.to_string());
        }
        subdomains.sort_unstable();
        subdomains
    }
}

impl Default for SubfinderScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for SubfinderScanner {
    fn name(&self) -> &'static str {
        "subfinder"
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        input: ScannerInput,
    ) -> Result<ScanData, AppError> {
        let ScannerInput::Subfinder(input) = input else {
            return Err(AppError::validation(
                "input",
                "invalid input type, expected subfinder input",
            ));
        };
        self.validate_input(&ScannerInput::Subfinder(input.clone()))?;

        info!("Starting subfinder enumeration for domain: {}", input.domain);

        let args = Self::build_args(&input.domain);
        let output = tokio::time::timeout(self.hard_timeout, run_tool(cancel, "subfinder", &args, None))
            .await
            .map_err(|_| {
                AppError::timeout(format!(
                    "subfinder enumeration exceeded {}s hard timeout",
                    self.hard_timeout.as_secs()
                ))
            })??;

        let subdomains = Self::shape_output(&input.domain, &output.stdout_lines);
        info!(
            "Subfinder found {} unique subdomains for domain: {}",
            subdomains.len(),
            input.domain
        );

        Ok(ScanData::Subfinder(SubfinderData {
            domain: input.domain,
            subdomains,
        }))
    }
}
