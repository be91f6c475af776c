//! Time and duration conversion utilities.
//!
//! The widget reports offsets as floating point seconds, which may be
//! `NaN` or negative before metadata has loaded. Conversions here never
//! panic and saturate instead of truncating.

use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    fn as_millis_u64(&self) -> u64;

    /// Convert duration to seconds as u32, saturating at `u32::MAX`.
    fn as_secs_u32(&self) -> u32;

    /// Render as `m:ss` for a progress display.
    fn to_clock(&self) -> String;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }

    fn as_secs_u32(&self) -> u32 {
        u32::try_from(self.as_secs()).unwrap_or(u32::MAX)
    }

    fn to_clock(&self) -> String {
        let total = self.as_secs_u32();
        format!("{}:{:02}", total / 60, total % 60)
    }
}

/// Convert widget-reported seconds into a `Duration`.
///
/// Returns `None` for `NaN`, infinite, or negative input.
#[must_use]
pub fn duration_from_secs(seconds: f64) -> Option<Duration> {
    if seconds.is_finite() && seconds >= 0.0 {
        Duration::try_from_secs_f64(seconds).ok()
    } else {
        None
    }
}

/// Format an optional duration, using `0:00` when unknown.
#[must_use]
pub fn format_clock(duration: Option<Duration>) -> String {
    duration.map_or_else(|| "0:00".to_string(), |d| d.to_clock())
}
