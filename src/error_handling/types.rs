//! Error type definitions.
//!
//! This module defines the structured error used across the worker and the
//! error kinds that drive retry decisions.

use std::fmt;

use strum_macros::EnumIter;
use thiserror::Error;

/// Classification of an error, determining whether the operation that produced
/// it may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ErrorKind {
    /// Structural problem with an input; retrying cannot help
    Validation,
    /// Bad or missing configuration
    Configuration,
    /// Network-level failure (connection refused, reset, DNS transport, ...)
    Network,
    /// An operation exceeded its deadline
    Timeout,
    /// The upstream denied the operation
    Permission,
    /// A referenced resource does not exist
    NotFound,
    /// A scanner engine failed
    Scanner,
    /// Anything else
    Internal,
}

impl ErrorKind {
    /// Whether errors of this kind are worth retrying.
    ///
    /// Unknown/internal errors default to retryable: a transient cause is more
    /// likely than a permanent one, and the retry budget is bounded anyway.
    pub fn is_retryable(self) -> bool {
        match self {
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::Scanner | ErrorKind::Internal => {
                true
            }
            ErrorKind::Validation
            | ErrorKind::Configuration
            | ErrorKind::Permission
            | ErrorKind::NotFound => false,
        }
    }

    /// Stable lowercase name, matching the persisted/logged representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Scanner => "scanner",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured worker error: a kind, an optional field name, a human message,
/// and an optional wrapped cause.
#[derive(Debug)]
pub struct AppError {
    /// Error classification
    pub kind: ErrorKind,
    /// Name of the field or component the error refers to, if any
    pub field: Option<String>,
    /// Human-readable message
    pub message: String,
    /// Wrapped cause, if any
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.field, &self.source) {
            (Some(field), Some(source)) => {
                write!(f, "{}: {} [{}] ({})", self.kind, self.message, field, source)
            }
            (Some(field), None) => write!(f, "{}: {} [{}]", self.kind, self.message, field),
            (None, Some(source)) => write!(f, "{}: {} ({})", self.kind, self.message, source),
            (None, None) => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl AppError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
            source: None,
        }
    }

    fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a validation error for the given field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::new(ErrorKind::Validation, message)
        }
    }

    /// Creates a configuration error for the given field.
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::new(ErrorKind::Configuration, message)
        }
    }

    /// Creates a network error wrapping its cause.
    pub fn network(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::with_source(ErrorKind::Network, message, source)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Creates a permission error.
    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permission, message)
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates a scanner error wrapping the engine failure.
    pub fn scanner(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::with_source(ErrorKind::Scanner, message, source)
    }

    /// Creates a scanner error without a cause.
    pub fn scanner_msg(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Scanner, message)
    }

    /// Creates an internal error wrapping its cause.
    pub fn internal(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::with_source(ErrorKind::Internal, message, source)
    }
}

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    Logger(#[from] log::SetLoggerError),

    /// Error initializing an HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Error initializing the DNS resolver.
    #[error("DNS resolver initialization error: {0}")]
    DnsResolver(String),
}
