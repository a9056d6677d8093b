//! Track metrics: cumulative distance and elevation gain over an ordered
//! sequence of fixes.
//!
//! Both computations are folds over consecutive pairs; the input order is the
//! chronological order of the track and is never changed.

use crate::geo_utils::haversine_distance;
use crate::{GeoPoint, GpsFix, TrackMetrics};

/// How elevation gain treats a fix without an altitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MissingAltitude {
    /// A missing altitude reads as 0 m. Climbing from a gap counts the full
    /// altitude as gain.
    #[default]
    TreatAsZero,
    /// Steps into or out of a fix without altitude contribute nothing.
    Skip,
}

/// Total length of a point sequence in meters.
///
/// Sums the haversine distance between consecutive points. Sequences with
/// fewer than two points have length 0.
///
/// # Example
///
/// ```rust
/// use cyclefog_engine::{GeoPoint, metrics};
///
/// let track = vec![
///     GeoPoint::new(52.5200, 13.4050),
///     GeoPoint::new(52.5210, 13.4050),
///     GeoPoint::new(52.5220, 13.4050),
/// ];
/// let length = metrics::total_distance(&track);
/// assert!((length - 222.4).abs() < 1.0);
/// assert_eq!(metrics::total_distance(&track[..1]), 0.0);
/// ```
pub fn total_distance(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Sum of the positive altitude steps along a sequence, in meters.
///
/// Descents are ignored. Fewer than two altitudes yield 0.
///
/// # Example
///
/// ```rust
/// use cyclefog_engine::metrics::{elevation_gain, MissingAltitude};
///
/// let altitudes = [Some(100.0), Some(90.0), Some(120.0), Some(80.0)];
/// assert_eq!(elevation_gain(altitudes, MissingAltitude::TreatAsZero), 30.0);
/// ```
pub fn elevation_gain<I>(altitudes: I, missing: MissingAltitude) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (_, gain) = altitudes
        .into_iter()
        .map(|altitude| match missing {
            MissingAltitude::TreatAsZero => Some(altitude.unwrap_or(0.0)),
            MissingAltitude::Skip => altitude,
        })
        .fold((None, 0.0), |(previous, gain), current| {
            let step = match (previous, current) {
                (Some(prev), Some(curr)) if curr > prev => curr - prev,
                _ => 0.0,
            };
            (current, gain + step)
        });
    gain
}

impl TrackMetrics {
    /// Distance and elevation gain of a fix sequence.
    pub fn from_fixes(fixes: &[GpsFix], missing: MissingAltitude) -> Self {
        let points: Vec<GeoPoint> = fixes.iter().map(GpsFix::point).collect();
        let total_distance_meters = total_distance(&points);
        let elevation_gain_meters = elevation_gain(fixes.iter().map(|f| f.altitude), missing);

        Self {
            total_distance_meters,
            elevation_gain_meters,
        }
    }
}
