//! Error classification and retriability.
//!
//! Scanner engines, blob stores, and the broker all surface foreign error
//! types. This module maps any error text to an [`ErrorKind`] using two
//! substring lists, and decides retriability for typed worker errors.

use super::types::{AppError, ErrorKind};

/// Messages that indicate a permanent failure; retrying cannot change the
/// outcome.
const PERMANENT_PATTERNS: &[&str] = &[
    "unknown task type",
    "domain is required",
    "invalid domain",
    "not yet implemented",
    "permission denied",
    "unauthorized",
    "forbidden",
    "not found",
];

/// Messages that indicate a transient failure worth retrying.
const RETRYABLE_PATTERNS: &[&str] = &[
    "timeout",
    "connection",
    "network",
    "temporary",
    "rate limit",
    "throttle",
    "service unavailable",
    "internal server error",
    "bad gateway",
    "gateway timeout",
    "context deadline exceeded",
    "context canceled",
];

/// Classifies an arbitrary error message into an [`ErrorKind`].
///
/// Matching is case-insensitive. Permanent patterns win over retryable ones;
/// anything unrecognized is `Internal`, which is retryable.
pub fn classify_text(text: &str) -> ErrorKind {
    let lowered = text.to_lowercase();

    if PERMANENT_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return ErrorKind::Validation;
    }
    if RETRYABLE_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return ErrorKind::Network;
    }

    ErrorKind::Internal
}

/// Decides whether a worker error should be retried.
///
/// Strongly-typed kinds (validation, permission, ...) carry their own verdict.
/// Scanner and internal errors wrap foreign failures, so their full text is
/// re-examined against the substring lists; a scanner error whose message says
/// "unauthorized" must not burn retry attempts.
pub fn is_retryable_error(error: &AppError) -> bool {
    match error.kind {
        ErrorKind::Scanner | ErrorKind::Internal => classify_text(&error.to_string()).is_retryable(),
        kind => kind.is_retryable(),
    }
}
