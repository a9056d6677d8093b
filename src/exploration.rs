//! Exploration ("fog of war") reconciliation.
//!
//! A user's exploration map is a set of [`ExplorationTileRecord`]s, one per
//! tile ever visited, all at a single system-wide zoom level. When a track is
//! recorded its distinct tiles are diffed against the existing records:
//!
//! - a tile with no record produces [`ExplorationDecision::Create`] with
//!   `visit_count = 1` and both timestamps set to `now`;
//! - a tile with a record produces [`ExplorationDecision::Update`] with
//!   `visit_count + 1` and `last_visited_at = now`, keeping
//!   `first_explored_at`.
//!
//! Each track counts as at most one visit per tile. The reconciler does no
//! I/O; applying the resulting [`ExplorationPlan`] is up to an
//! [`ExplorationStore`](crate::store::ExplorationStore).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::coverage::tiles_for_track;
use crate::error::{GeoError, Result};
use crate::tiles::MAX_ZOOM;
use crate::{GeoPoint, TileCoordinate};

/// Zoom level of the exploration grid unless configured otherwise.
pub const DEFAULT_EXPLORATION_ZOOM: u8 = 16;

/// Persisted exploration state of one tile for one user.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExplorationTileRecord {
    pub user_id: String,
    pub tile: TileCoordinate,
    pub first_explored_at: DateTime<Utc>,
    pub last_visited_at: DateTime<Utc>,
    /// Number of tracks that touched the tile, at least 1
    pub visit_count: u32,
}

impl ExplorationTileRecord {
    /// Record for a tile visited for the first time at `at`.
    pub fn first_visit(user_id: &str, tile: TileCoordinate, at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            tile,
            first_explored_at: at,
            last_visited_at: at,
            visit_count: 1,
        }
    }

    /// This record after one more visit at `at`.
    pub fn revisited(&self, at: DateTime<Utc>) -> Self {
        Self {
            last_visited_at: at,
            visit_count: self.visit_count.saturating_add(1),
            ..self.clone()
        }
    }
}

/// What should happen to one tile's record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "record", rename_all = "snake_case"))]
pub enum ExplorationDecision {
    /// First visit: insert this record.
    Create(ExplorationTileRecord),
    /// Revisit: the existing record becomes this one.
    Update(ExplorationTileRecord),
}

impl ExplorationDecision {
    pub fn record(&self) -> &ExplorationTileRecord {
        match self {
            Self::Create(record) | Self::Update(record) => record,
        }
    }

    pub fn tile(&self) -> TileCoordinate {
        self.record().tile
    }

    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create(_))
    }
}

/// Decisions produced for one track of one user.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExplorationPlan {
    pub user_id: String,
    /// Identifies the track so a store can apply the plan exactly once
    pub track_id: String,
    pub visited_at: DateTime<Utc>,
    /// One decision per distinct tile, in the track's first-occurrence order
    pub decisions: Vec<ExplorationDecision>,
}

impl ExplorationPlan {
    /// Tiles explored for the first time.
    pub fn new_tile_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_create()).count()
    }

    /// Tiles that already had a record.
    pub fn revisited_tile_count(&self) -> usize {
        self.decisions.len() - self.new_tile_count()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// Merges a track's tiles into a user's exploration records at a fixed zoom.
///
/// The zoom is fixed at construction so that every track of every user lands
/// on the same grid.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use chrono::{TimeZone, Utc};
/// use cyclefog_engine::{GeoPoint, ExplorationReconciler};
///
/// let reconciler = ExplorationReconciler::new(16).unwrap();
/// let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
/// let track = vec![GeoPoint::new(52.5200, 13.4050), GeoPoint::new(52.5201, 13.4051)];
///
/// let plan = reconciler
///     .reconcile_track("user-1", "track-1", &track, now, &HashMap::new())
///     .unwrap();
/// assert_eq!(plan.new_tile_count(), 1);
/// assert_eq!(plan.decisions[0].record().visit_count, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorationReconciler {
    zoom: u8,
}

impl Default for ExplorationReconciler {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_EXPLORATION_ZOOM,
        }
    }
}

impl ExplorationReconciler {
    /// Reconciler for the exploration grid at `zoom`.
    ///
    /// # Errors
    ///
    /// [`GeoError::InvalidZoom`] if `zoom` exceeds [`MAX_ZOOM`].
    pub fn new(zoom: u8) -> Result<Self> {
        if zoom > MAX_ZOOM {
            return Err(GeoError::InvalidZoom(zoom));
        }
        Ok(Self { zoom })
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Project a track onto the exploration grid and reconcile its tiles.
    pub fn reconcile_track(
        &self,
        user_id: &str,
        track_id: &str,
        points: &[GeoPoint],
        now: DateTime<Utc>,
        existing: &HashMap<TileCoordinate, ExplorationTileRecord>,
    ) -> Result<ExplorationPlan> {
        let tiles = tiles_for_track(points, self.zoom)?;
        self.reconcile_tiles(user_id, track_id, &tiles, now, existing)
    }

    /// Reconcile already-extracted tiles.
    ///
    /// Repeated tiles in `tiles` are counted once. `existing` must hold only
    /// records of `user_id`.
    ///
    /// # Errors
    ///
    /// Checked in this order, before any decision is produced:
    ///
    /// * [`GeoError::ForeignRecord`] if a record in `existing` belongs to
    ///   another user.
    /// * [`GeoError::ZoomMismatch`] if a tile is not at the reconciler's zoom.
    /// * [`GeoError::InvalidTile`] if a tile lies outside its grid.
    pub fn reconcile_tiles(
        &self,
        user_id: &str,
        track_id: &str,
        tiles: &[TileCoordinate],
        now: DateTime<Utc>,
        existing: &HashMap<TileCoordinate, ExplorationTileRecord>,
    ) -> Result<ExplorationPlan> {
        if let Some(record) = existing.values().find(|r| r.user_id != user_id) {
            return Err(GeoError::ForeignRecord {
                user_id: user_id.to_string(),
                owner: record.user_id.clone(),
            });
        }

        for tile in tiles {
            if tile.zoom != self.zoom {
                return Err(GeoError::ZoomMismatch {
                    expected: self.zoom,
                    found: tile.zoom,
                });
            }
            if !tile.is_valid() {
                return Err(GeoError::InvalidTile {
                    x: tile.x,
                    y: tile.y,
                    zoom: tile.zoom,
                });
            }
        }

        let mut decided = HashSet::with_capacity(tiles.len());
        let decisions = tiles
            .iter()
            .filter(|tile| decided.insert(**tile))
            .map(|tile| match existing.get(tile) {
                Some(record) => ExplorationDecision::Update(record.revisited(now)),
                None => ExplorationDecision::Create(ExplorationTileRecord::first_visit(
                    user_id, *tile, now,
                )),
            })
            .collect();

        Ok(ExplorationPlan {
            user_id: user_id.to_string(),
            track_id: track_id.to_string(),
            visited_at: now,
            decisions,
        })
    }
}
