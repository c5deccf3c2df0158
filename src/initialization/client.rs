//! HTTP client initialization.

use std::time::Duration;

use crate::error_handling::InitializationError;

/// Initializes a `reqwest` client with the given request timeout.
///
/// Used for the orchestrator callback and the step webhook; both are small
/// JSON POSTs, so a single shared configuration suffices.
///
/// # Errors
///
/// Returns `InitializationError::HttpClient` if the TLS backend cannot be
/// initialized.
pub fn init_http_client(timeout: Duration) -> Result<reqwest::Client, InitializationError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .build()?;
    Ok(client)
}
