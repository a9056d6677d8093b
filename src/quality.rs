//! Point quality filtering.
//!
//! GPS receivers report a horizontal accuracy radius with most fixes. Fixes
//! whose radius exceeds a threshold are dropped before metrics and tiles are
//! computed. A fix without an accuracy value is trusted.

use crate::GpsFix;

/// Default accuracy threshold in meters.
pub const DEFAULT_MAX_ACCURACY_METERS: f64 = 50.0;

/// True if the fix has no accuracy value or its accuracy is at most
/// `max_accuracy_meters`.
///
/// # Example
///
/// ```rust
/// use cyclefog_engine::{GpsFix, quality};
/// use chrono::{TimeZone, Utc};
///
/// let t = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
/// let fix = GpsFix::new(52.52, 13.405, t).with_accuracy(120.0);
/// assert!(!quality::is_accurate(&fix, quality::DEFAULT_MAX_ACCURACY_METERS));
/// assert!(quality::is_accurate(&fix, 150.0));
/// ```
#[inline]
pub fn is_accurate(fix: &GpsFix, max_accuracy_meters: f64) -> bool {
    match fix.accuracy {
        Some(accuracy) => accuracy <= max_accuracy_meters,
        None => true,
    }
}

/// Keep only the fixes that pass [`is_accurate`], preserving their order.
pub fn filter_accurate(fixes: &[GpsFix], max_accuracy_meters: f64) -> Vec<GpsFix> {
    fixes
        .iter()
        .filter(|fix| is_accurate(fix, max_accuracy_meters))
        .cloned()
        .collect()
}
