//! Small shared utilities.

mod timing;

pub use timing::format_duration;
