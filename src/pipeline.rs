//! End-to-end track processing.
//!
//! raw fixes → quality filter → metrics + exploration tiles → reconcile
//!
//! [`analyze_track`] is pure. [`record_track`] additionally loads the user's
//! records from an [`ExplorationStore`], reconciles, and applies the plan.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::coverage::tiles_for_track;
use crate::error::{GeoError, Result};
use crate::exploration::{ExplorationPlan, ExplorationReconciler};
use crate::quality::filter_accurate;
use crate::store::ExplorationStore;
use crate::{EngineConfig, GeoPoint, GpsFix, TileCoordinate, TrackMetrics};

/// Summary of one track after filtering.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackReport {
    pub metrics: TrackMetrics,
    /// Exploration tiles touched, in first-occurrence order
    pub tiles: Vec<TileCoordinate>,
    pub accepted_fixes: usize,
    pub rejected_fixes: usize,
    /// Timestamp of the first accepted fix
    pub started_at: Option<DateTime<Utc>>,
    /// Timestamp of the last accepted fix
    pub ended_at: Option<DateTime<Utc>>,
}

impl TrackReport {
    /// Time between the first and last accepted fix.
    pub fn duration(&self) -> Option<Duration> {
        Some(self.ended_at? - self.started_at?)
    }
}

/// Filter, measure and tile one track.
///
/// # Errors
///
/// Fails if an accepted fix cannot be projected onto the exploration grid,
/// or the configured exploration zoom is invalid.
///
/// # Example
///
/// ```rust
/// use chrono::{Duration, TimeZone, Utc};
/// use cyclefog_engine::{EngineConfig, GpsFix, pipeline};
///
/// let start = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
/// let fixes: Vec<GpsFix> = (0..10)
///     .map(|i| GpsFix::new(52.52 + i as f64 * 0.001, 13.405, start + Duration::seconds(i * 10)))
///     .collect();
///
/// let report = pipeline::analyze_track(&fixes, &EngineConfig::default()).unwrap();
/// assert_eq!(report.accepted_fixes, 10);
/// assert!(report.metrics.total_distance_meters > 900.0);
/// assert_eq!(report.duration(), Some(Duration::seconds(90)));
/// ```
pub fn analyze_track(fixes: &[GpsFix], config: &EngineConfig) -> Result<TrackReport> {
    let accepted = filter_accurate(fixes, config.max_accuracy_meters);
    let points: Vec<GeoPoint> = accepted.iter().map(GpsFix::point).collect();

    let tiles = tiles_for_track(&points, config.exploration_zoom)?;
    let metrics = TrackMetrics::from_fixes(&accepted, config.missing_altitude);

    Ok(TrackReport {
        metrics,
        tiles,
        accepted_fixes: accepted.len(),
        rejected_fixes: fixes.len() - accepted.len(),
        started_at: accepted.first().map(|f| f.timestamp),
        ended_at: accepted.last().map(|f| f.timestamp),
    })
}

/// Analyze independent tracks one after another.
pub fn analyze_tracks(tracks: &[Vec<GpsFix>], config: &EngineConfig) -> Vec<Result<TrackReport>> {
    tracks
        .iter()
        .map(|fixes| analyze_track(fixes, config))
        .collect()
}

/// Analyze independent tracks on the rayon pool.
///
/// Results are in input order. Each track is still processed sequentially.
#[cfg(feature = "parallel")]
pub fn analyze_tracks_parallel(
    tracks: &[Vec<GpsFix>],
    config: &EngineConfig,
) -> Vec<Result<TrackReport>> {
    use rayon::prelude::*;

    tracks
        .par_iter()
        .map(|fixes| analyze_track(fixes, config))
        .collect()
}

/// Failure of [`record_track`].
#[derive(Debug, Error)]
pub enum RecordTrackError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Geo(#[from] GeoError),
    #[error("exploration store failed: {0}")]
    Store(#[source] E),
}

/// Outcome of [`record_track`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTrack {
    pub report: TrackReport,
    pub plan: ExplorationPlan,
    /// Records written by the store (0 if the plan had already been applied)
    pub applied: usize,
}

/// Analyze a track and merge it into the user's exploration records.
pub fn record_track<S: ExplorationStore>(
    store: &mut S,
    user_id: &str,
    track_id: &str,
    fixes: &[GpsFix],
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> std::result::Result<RecordedTrack, RecordTrackError<S::Error>> {
    let reconciler = ExplorationReconciler::new(config.exploration_zoom)?;
    let report = analyze_track(fixes, config)?;

    let existing = store
        .load_exploration_records(user_id)
        .map_err(RecordTrackError::Store)?;
    let plan = reconciler.reconcile_tiles(user_id, track_id, &report.tiles, now, &existing)?;
    let applied = store
        .apply_exploration_plan(&plan)
        .map_err(RecordTrackError::Store)?;

    Ok(RecordedTrack {
        report,
        plan,
        applied,
    })
}
