//! Export filename policy: `{prefix}_{YYYY-MM-DD}_{HHMMSS}.png`.

use chrono::{Local, NaiveDateTime};

/// Prefix used when none (or only whitespace) is given.
pub const DEFAULT_PREFIX: &str = "display";

/// Trimmed prefix, or [`DEFAULT_PREFIX`] when blank.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> &str {
    match prefix.trim() {
        "" => DEFAULT_PREFIX,
        trimmed => trimmed,
    }
}

/// Filename for an export taken at `at`.
#[must_use]
pub fn dated_filename(prefix: &str, at: NaiveDateTime) -> String {
    format!(
        "{}_{}.png",
        normalize_prefix(prefix),
        at.format("%Y-%m-%d_%H%M%S")
    )
}

/// Filename for an export taken now, in local time.
#[must_use]
pub fn export_filename(prefix: &str) -> String {
    dated_filename(prefix, Local::now().naive_local())
}
