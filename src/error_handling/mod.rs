//! Error handling: taxonomy, classification, retriability, failure counters.
//!
//! Every failure in the worker is expressed as an [`AppError`] carrying an
//! [`ErrorKind`]; the kind decides whether the retry engine gets another shot
//! at the operation. Foreign errors are classified by message text.

mod classification;
mod stats;
mod types;

pub use classification::{classify_text, is_retryable_error};
pub use stats::ProcessingStats;
pub use types::{AppError, ErrorKind, InitializationError};
