//! # CycleFog Engine
//!
//! Track geometry and exploration ("fog of war") tiles for a social cycling app.
//!
//! This library provides:
//! - Great-circle distance and track metrics (distance, elevation gain)
//! - Web Mercator tile projection and tile coverage of tracks and map bounds
//! - GPS quality filtering
//! - Reconciliation of a recorded track against a user's explored tiles
//! - Radius queries for proximity alerts
//!
//! ## Features
//!
//! - **`parallel`** - Analyze batches of tracks on the rayon pool
//! - **`serde`** - Serialize/deserialize all data types
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use chrono::{Duration, TimeZone, Utc};
//! use cyclefog_engine::{EngineConfig, ExplorationReconciler, GpsFix, pipeline};
//!
//! let start = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
//! let fixes: Vec<GpsFix> = (0..30)
//!     .map(|i| GpsFix::new(52.5200, 13.4050 + i as f64 * 0.0005, start + Duration::seconds(i * 5)))
//!     .collect();
//!
//! let report = pipeline::analyze_track(&fixes, &EngineConfig::default()).unwrap();
//! println!("{:.0} m over {} tiles", report.metrics.total_distance_meters, report.tiles.len());
//!
//! let plan = ExplorationReconciler::default()
//!     .reconcile_tiles("user-1", "ride-1", &report.tiles, start, &HashMap::new())
//!     .unwrap();
//! assert_eq!(plan.new_tile_count(), report.tiles.len());
//! ```

pub mod coverage;
pub mod error;
pub mod exploration;
pub mod geo_utils;
pub mod metrics;
pub mod pipeline;
pub mod proximity;
pub mod quality;
pub mod store;
pub mod tiles;

pub use coverage::{tiles_for_track, tiles_in_bounds, TileRange};
pub use error::{GeoError, Result};
pub use exploration::{
    ExplorationDecision, ExplorationPlan, ExplorationReconciler, ExplorationTileRecord,
    DEFAULT_EXPLORATION_ZOOM,
};
pub use geo_utils::{haversine_distance, is_within_distance};
pub use metrics::MissingAltitude;
pub use pipeline::{analyze_track, analyze_tracks, record_track, RecordTrackError, TrackReport};
#[cfg(feature = "parallel")]
pub use pipeline::analyze_tracks_parallel;
pub use proximity::{NearbyLocation, ProximityIndex};
pub use quality::{filter_accurate, is_accurate, DEFAULT_MAX_ACCURACY_METERS};
pub use store::{ExplorationStore, MemoryExplorationStore};
pub use tiles::{to_lat_lng, to_tile, MAX_ZOOM};

use chrono::{DateTime, Utc};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("CycleFogRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate in decimal degrees.
///
/// # Example
/// ```
/// use cyclefog_engine::GeoPoint;
/// let point = GeoPoint::new(52.5200, 13.4050); // Berlin
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point. No validation is performed.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has finite coordinates within the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One timestamped sample from the device's positioning receiver.
///
/// Only the position takes part in geodesy. `altitude` feeds elevation gain
/// and `accuracy` (horizontal radius in meters) feeds the quality filter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level
    pub altitude: Option<f64>,
    /// Horizontal accuracy radius in meters
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl GpsFix {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            timestamp,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// The fix's position.
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// A cell of the Web Mercator tile grid.
///
/// At zoom `z` the world is split into `2^z x 2^z` tiles; `x` grows eastward
/// from the antimeridian and `y` grows southward from the northern Mercator
/// limit. Tiles are compared and hashed by `(x, y, zoom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileCoordinate {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

/// Geographic rectangle given by its edges in degrees.
///
/// A valid box has `north > south` and `west < east`; boxes crossing the
/// antimeridian are not supported.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Check edge ordering and finiteness.
    ///
    /// Coordinate ranges are left to the projection, which reports the
    /// offending corner.
    pub fn validate(&self) -> Result<()> {
        let finite = [self.north, self.south, self.east, self.west]
            .iter()
            .all(|v| v.is_finite());

        if !finite || self.north <= self.south || self.west >= self.east {
            return Err(GeoError::InvalidBounds {
                north: self.north,
                south: self.south,
                east: self.east,
                west: self.west,
            });
        }
        Ok(())
    }

    /// Whether `point` lies inside the box, edges included.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.latitude)
            && (self.west..=self.east).contains(&point.longitude)
    }
}

/// Distance and climb of a track.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackMetrics {
    /// Sum of great-circle distances between consecutive fixes
    pub total_distance_meters: f64,
    /// Sum of positive altitude steps
    pub elevation_gain_meters: f64,
}

/// Configuration for track processing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Fixes with a horizontal accuracy radius above this are dropped.
    /// Default: 50.0 meters
    pub max_accuracy_meters: f64,

    /// Zoom level of the exploration grid. Must be the same for every track
    /// of every user, or records from different grids will never match.
    /// Default: 16 (~600 m tiles at the equator, ~370 m at 52°N)
    pub exploration_zoom: u8,

    /// How elevation gain treats fixes without altitude.
    /// Default: `TreatAsZero`
    pub missing_altitude: MissingAltitude,

    /// Radius for proximity alerts.
    /// Default: 500.0 meters
    pub proximity_threshold_meters: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_accuracy_meters: DEFAULT_MAX_ACCURACY_METERS,
            exploration_zoom: DEFAULT_EXPLORATION_ZOOM,
            missing_altitude: MissingAltitude::default(),
            proximity_threshold_meters: 500.0,
        }
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use chrono::TimeZone;
    use log::{debug, info};
    use std::collections::HashMap;

    // Timestamps cross the boundary as Unix milliseconds.

    fn from_millis(ms: i64) -> std::result::Result<DateTime<Utc>, GeoError> {
        Utc.timestamp_millis_opt(ms)
            .single()
            .ok_or(GeoError::InvalidTimestamp(ms))
    }

    /// A GPS fix as passed from the mobile app.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiGpsFix {
        pub latitude: f64,
        pub longitude: f64,
        pub altitude: Option<f64>,
        pub accuracy: Option<f64>,
        pub timestamp_ms: i64,
    }

    impl TryFrom<FfiGpsFix> for GpsFix {
        type Error = GeoError;

        fn try_from(fix: FfiGpsFix) -> std::result::Result<Self, Self::Error> {
            Ok(GpsFix {
                latitude: fix.latitude,
                longitude: fix.longitude,
                altitude: fix.altitude,
                accuracy: fix.accuracy,
                timestamp: from_millis(fix.timestamp_ms)?,
            })
        }
    }

    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiTrackReport {
        pub metrics: TrackMetrics,
        pub tiles: Vec<TileCoordinate>,
        pub accepted_fixes: u32,
        pub rejected_fixes: u32,
        pub started_at_ms: Option<i64>,
        pub ended_at_ms: Option<i64>,
    }

    impl From<TrackReport> for FfiTrackReport {
        fn from(report: TrackReport) -> Self {
            Self {
                metrics: report.metrics,
                tiles: report.tiles,
                accepted_fixes: report.accepted_fixes as u32,
                rejected_fixes: report.rejected_fixes as u32,
                started_at_ms: report.started_at.map(|t| t.timestamp_millis()),
                ended_at_ms: report.ended_at.map(|t| t.timestamp_millis()),
            }
        }
    }

    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiExplorationRecord {
        pub user_id: String,
        pub tile: TileCoordinate,
        pub first_explored_at_ms: i64,
        pub last_visited_at_ms: i64,
        pub visit_count: u32,
    }

    impl TryFrom<FfiExplorationRecord> for ExplorationTileRecord {
        type Error = GeoError;

        fn try_from(record: FfiExplorationRecord) -> std::result::Result<Self, Self::Error> {
            Ok(ExplorationTileRecord {
                user_id: record.user_id,
                tile: record.tile,
                first_explored_at: from_millis(record.first_explored_at_ms)?,
                last_visited_at: from_millis(record.last_visited_at_ms)?,
                visit_count: record.visit_count,
            })
        }
    }

    impl From<&ExplorationTileRecord> for FfiExplorationRecord {
        fn from(record: &ExplorationTileRecord) -> Self {
            Self {
                user_id: record.user_id.clone(),
                tile: record.tile,
                first_explored_at_ms: record.first_explored_at.timestamp_millis(),
                last_visited_at_ms: record.last_visited_at.timestamp_millis(),
                visit_count: record.visit_count,
            }
        }
    }

    /// A record to insert (`is_new`) or to overwrite the stored one with.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiExplorationDecision {
        pub is_new: bool,
        pub record: FfiExplorationRecord,
    }

    /// A location for [`ffi_nearby_locations`].
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiLocation {
        pub id: String,
        pub point: GeoPoint,
    }

    /// Engine defaults, so the app doesn't duplicate them.
    #[uniffi::export]
    pub fn default_engine_config() -> EngineConfig {
        EngineConfig::default()
    }

    /// Filter a recorded track and compute its metrics and exploration tiles.
    #[uniffi::export]
    pub fn ffi_track_metrics(
        fixes: Vec<FfiGpsFix>,
        config: EngineConfig,
    ) -> std::result::Result<FfiTrackReport, GeoError> {
        init_logging();
        info!("[CycleFogRust] track_metrics called with {} fixes", fixes.len());

        let fixes = fixes
            .into_iter()
            .map(GpsFix::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let start = std::time::Instant::now();
        let report = analyze_track(&fixes, &config)?;
        info!(
            "[CycleFogRust] {:.0}m, {:.0}m gain, {} tiles ({} fixes rejected) in {:?}",
            report.metrics.total_distance_meters,
            report.metrics.elevation_gain_meters,
            report.tiles.len(),
            report.rejected_fixes,
            start.elapsed()
        );
        Ok(report.into())
    }

    /// Distinct tiles of a point sequence, in first-occurrence order.
    #[uniffi::export]
    pub fn ffi_track_tiles(
        points: Vec<GeoPoint>,
        zoom: u8,
    ) -> std::result::Result<Vec<TileCoordinate>, GeoError> {
        init_logging();
        debug!("[CycleFogRust] track_tiles: {} points at zoom {}", points.len(), zoom);
        tiles_for_track(&points, zoom)
    }

    /// Tiles covering a map viewport. Fails with `TooManyTiles` rather than
    /// allocating more than `max_tiles`.
    #[uniffi::export]
    pub fn ffi_tiles_in_bounds(
        bounds: BoundingBox,
        zoom: u8,
        max_tiles: u64,
    ) -> std::result::Result<Vec<TileCoordinate>, GeoError> {
        init_logging();
        let range = tiles_in_bounds(&bounds, zoom)?;
        let count = range.tile_count();
        debug!("[CycleFogRust] tiles_in_bounds: {} tiles at zoom {}", count, zoom);

        if count > max_tiles {
            info!("[CycleFogRust] tiles_in_bounds refused: {} > {}", count, max_tiles);
            return Err(GeoError::TooManyTiles {
                count,
                limit: max_tiles,
            });
        }
        Ok(range.collect())
    }

    /// Geographic extent of one tile, for drawing the fog overlay.
    #[uniffi::export]
    pub fn ffi_tile_bounds(tile: TileCoordinate) -> std::result::Result<BoundingBox, GeoError> {
        tile.bounds()
    }

    /// Diff a track's tiles against the user's stored records.
    ///
    /// `existing` may contain the user's full record set or only the records
    /// for `tiles`. Records of any other user are rejected.
    #[uniffi::export]
    pub fn ffi_reconcile_exploration(
        user_id: String,
        track_id: String,
        tiles: Vec<TileCoordinate>,
        now_ms: i64,
        existing: Vec<FfiExplorationRecord>,
        config: EngineConfig,
    ) -> std::result::Result<Vec<FfiExplorationDecision>, GeoError> {
        init_logging();
        info!(
            "[CycleFogRust] reconcile_exploration for {} / {}: {} tiles, {} existing records",
            user_id,
            track_id,
            tiles.len(),
            existing.len()
        );

        let now = from_millis(now_ms)?;
        let existing = existing
            .into_iter()
            .map(|r| -> std::result::Result<_, GeoError> {
                Ok((r.tile, ExplorationTileRecord::try_from(r)?))
            })
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        let reconciler = ExplorationReconciler::new(config.exploration_zoom)?;
        let plan = reconciler.reconcile_tiles(&user_id, &track_id, &tiles, now, &existing)?;
        info!(
            "[CycleFogRust] {} new tiles, {} revisited",
            plan.new_tile_count(),
            plan.revisited_tile_count()
        );

        Ok(plan
            .decisions
            .iter()
            .map(|decision| FfiExplorationDecision {
                is_new: decision.is_create(),
                record: decision.record().into(),
            })
            .collect())
    }

    /// Locations within `radius_meters` of `center`, nearest first.
    #[uniffi::export]
    pub fn ffi_nearby_locations(
        center: GeoPoint,
        locations: Vec<FfiLocation>,
        radius_meters: f64,
    ) -> Vec<NearbyLocation> {
        init_logging();
        let index = ProximityIndex::new(
            locations
                .into_iter()
                .map(|location| (location.id, location.point))
                .collect(),
        );
        let nearby = index.within(&center, radius_meters);
        debug!(
            "[CycleFogRust] nearby_locations: {} of {} within {:.0}m",
            nearby.len(),
            index.len(),
            radius_meters
        );
        nearby
    }

}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(52.5200, 13.4050).is_valid());
        assert!(GeoPoint::new(-90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_bounding_box_validate() {
        assert!(BoundingBox::new(52.6, 52.4, 13.5, 13.3).validate().is_ok());
        // Degenerate and inverted boxes
        assert!(BoundingBox::new(52.4, 52.4, 13.5, 13.3).validate().is_err());
        assert!(BoundingBox::new(52.4, 52.6, 13.5, 13.3).validate().is_err());
        // Antimeridian crossing
        assert!(BoundingBox::new(10.0, 0.0, -170.0, 170.0).validate().is_err());
        assert!(BoundingBox::new(f64::NAN, 0.0, 1.0, 0.0).validate().is_err());
    }

    #[test]
    fn test_bounding_box_contains() {
        let bounds = BoundingBox::new(52.6, 52.4, 13.5, 13.3);
        assert!(bounds.contains(&GeoPoint::new(52.52, 13.405)));
        assert!(bounds.contains(&GeoPoint::new(52.6, 13.3)));
        assert!(!bounds.contains(&GeoPoint::new(48.85, 2.35)));
    }

    #[test]
    fn test_gps_fix_builder() {
        let t = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 6, 1, 9, 0, 0).unwrap();
        let fix = GpsFix::new(52.52, 13.405, t).with_altitude(34.0).with_accuracy(5.0);
        assert_eq!(fix.altitude, Some(34.0));
        assert_eq!(fix.accuracy, Some(5.0));
        assert_eq!(fix.point(), GeoPoint::new(52.52, 13.405));
    }

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_accuracy_meters, 50.0);
        assert_eq!(config.exploration_zoom, 16);
        assert_eq!(config.missing_altitude, MissingAltitude::TreatAsZero);
        assert_eq!(config.proximity_threshold_meters, 500.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_shapes() {
        let tile = TileCoordinate::new(35210, 21493, 16);
        let json = serde_json::to_value(tile).unwrap();
        assert_eq!(json, serde_json::json!({ "x": 35210, "y": 21493, "zoom": 16 }));

        let t = chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 6, 1, 9, 0, 0).unwrap();
        let decision = ExplorationDecision::Create(ExplorationTileRecord::first_visit("u", tile, t));
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["kind"], "create");
        assert_eq!(json["record"]["visit_count"], 1);

        let back: ExplorationDecision = serde_json::from_value(json).unwrap();
        assert_eq!(back, decision);
    }
}
