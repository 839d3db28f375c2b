//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for readings, counter samples and log entries.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Whole seconds elapsed from `earlier` to `later`, clamped at zero.
#[must_use]
pub fn elapsed_secs(earlier: Timestamp, later: Timestamp) -> u64 {
    u64::try_from((later - earlier).num_seconds()).unwrap_or(0)
}
