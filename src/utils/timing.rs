//! Elapsed-time formatting.

use std::time::Duration;

/// Formats a wall-clock duration the way it is persisted in task results:
/// `250ms`, `3.421s`, `2m3.5s`, `1h2m3s`.
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    if d.as_millis() < 1000 {
        return format!("{}ms", d.as_millis());
    }
    if total_secs < 60 {
        return format!("{:.3}s", d.as_secs_f64());
    }
    if total_secs < 3600 {
        let mins = total_secs / 60;
        let secs = d.as_secs_f64() - (mins * 60) as f64;
        return format!("{mins}m{secs:.1}s");
    }
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{hours}h{mins}m{secs}s")
}
