//! Elapsed-time and duration display formatting
//!
//! The active-session display is always recomputed from wall-clock elapsed
//! seconds, never incremented, so a missed tick can never desynchronize it.

/// Format elapsed whole seconds for the live session display.
///
/// Hours are omitted while zero: `125` → `"2m 5s"`, `3725` → `"1h 2m 5s"`.
/// Negative inputs (clock skew) clamp to zero.
///
/// # Examples
///
/// ```
/// use acmp_common::time::format_elapsed;
///
/// assert_eq!(format_elapsed(0), "0m 0s");
/// assert_eq!(format_elapsed(125), "2m 5s");
/// assert_eq!(format_elapsed(3725), "1h 2m 5s");
/// ```
pub fn format_elapsed(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

/// Format a closed-session duration as a whole minute count: `3` → `"3m"`.
pub fn format_minutes(minutes: i64) -> String {
    format!("{}m", minutes.max(0))
}

/// Parse a formatted minute count back to a number (`"3m"` → 3).
///
/// Tolerates plain numbers; anything unparseable counts as zero so one
/// malformed stored record cannot poison the log statistics.
pub fn parse_minutes(formatted: &str) -> i64 {
    let digits: String = formatted
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}
