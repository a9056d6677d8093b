//! Persistence seam for exploration records.
//!
//! The engine never stores anything itself. Callers plug their database in
//! through [`ExplorationStore`]; [`MemoryExplorationStore`] is a reference
//! implementation used in tests and demos.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;

use log::debug;

use crate::exploration::{ExplorationPlan, ExplorationTileRecord};
use crate::TileCoordinate;

/// Loads and persists a user's exploration records.
///
/// Implementations must apply a plan at most once per `(user_id, track_id)`:
/// a retried plan must not increment any visit count a second time.
pub trait ExplorationStore {
    type Error: std::error::Error + 'static;

    /// All exploration records of `user_id`, keyed by tile.
    fn load_exploration_records(
        &self,
        user_id: &str,
    ) -> Result<HashMap<TileCoordinate, ExplorationTileRecord>, Self::Error>;

    /// Apply a plan. Returns the number of records written (0 for a plan
    /// that was already applied).
    fn apply_exploration_plan(&mut self, plan: &ExplorationPlan) -> Result<usize, Self::Error>;
}

/// In-memory [`ExplorationStore`].
///
/// Each decision is applied as one visit against the store's current state,
/// so two plans computed from the same snapshot both count.
#[derive(Debug, Default)]
pub struct MemoryExplorationStore {
    records: HashMap<String, HashMap<TileCoordinate, ExplorationTileRecord>>,
    applied: HashSet<(String, String)>,
}

impl MemoryExplorationStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tiles `user_id` has explored.
    pub fn explored_tile_count(&self, user_id: &str) -> usize {
        self.records.get(user_id).map_or(0, HashMap::len)
    }

    /// A single record, if present.
    pub fn get(&self, user_id: &str, tile: &TileCoordinate) -> Option<&ExplorationTileRecord> {
        self.records.get(user_id)?.get(tile)
    }

    /// Whether the plan for this track has been applied.
    pub fn is_applied(&self, user_id: &str, track_id: &str) -> bool {
        self.applied
            .contains(&(user_id.to_string(), track_id.to_string()))
    }
}

impl ExplorationStore for MemoryExplorationStore {
    type Error = Infallible;

    fn load_exploration_records(
        &self,
        user_id: &str,
    ) -> Result<HashMap<TileCoordinate, ExplorationTileRecord>, Self::Error> {
        Ok(self.records.get(user_id).cloned().unwrap_or_default())
    }

    fn apply_exploration_plan(&mut self, plan: &ExplorationPlan) -> Result<usize, Self::Error> {
        let key = (plan.user_id.clone(), plan.track_id.clone());
        if self.applied.contains(&key) {
            debug!(
                "Skipping already applied plan for user {} track {}",
                plan.user_id, plan.track_id
            );
            return Ok(0);
        }

        let user_records = self.records.entry(plan.user_id.clone()).or_default();
        for decision in &plan.decisions {
            let tile = decision.tile();
            match user_records.get_mut(&tile) {
                Some(record) => {
                    record.visit_count = record.visit_count.saturating_add(1);
                    record.last_visited_at = record.last_visited_at.max(plan.visited_at);
                }
                None => {
                    user_records.insert(
                        tile,
                        ExplorationTileRecord::first_visit(&plan.user_id, tile, plan.visited_at),
                    );
                }
            }
        }

        self.applied.insert(key);
        Ok(plan.decisions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exploration::ExplorationReconciler;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, n, 9, 0, 0).unwrap()
    }

    fn plan_for(
        store: &MemoryExplorationStore,
        track_id: &str,
        tiles: &[TileCoordinate],
        at: DateTime<Utc>,
    ) -> ExplorationPlan {
        let existing = store.load_exploration_records("user-1").unwrap();
        ExplorationReconciler::default()
            .reconcile_tiles("user-1", track_id, tiles, at, &existing)
            .unwrap()
    }

    #[test]
    fn test_apply_creates_and_updates() {
        let mut store = MemoryExplorationStore::new();
        let a = TileCoordinate::new(35210, 21493, 16);
        let b = TileCoordinate::new(35211, 21493, 16);

        let plan = plan_for(&store, "track-1", &[a], day(1));
        assert_eq!(store.apply_exploration_plan(&plan).unwrap(), 1);

        let plan = plan_for(&store, "track-2", &[a, b], day(2));
        assert_eq!(store.apply_exploration_plan(&plan).unwrap(), 2);

        let record = store.get("user-1", &a).unwrap();
        assert_eq!(record.visit_count, 2);
        assert_eq!(record.first_explored_at, day(1));
        assert_eq!(record.last_visited_at, day(2));
        assert_eq!(store.get("user-1", &b).unwrap().visit_count, 1);
        assert_eq!(store.explored_tile_count("user-1"), 2);
    }

    #[test]
    fn test_retried_plan_applies_once() {
        let mut store = MemoryExplorationStore::new();
        let tile = TileCoordinate::new(5, 5, 16);

        let plan = plan_for(&store, "track-1", &[tile], day(1));
        store.apply_exploration_plan(&plan).unwrap();
        assert_eq!(store.apply_exploration_plan(&plan).unwrap(), 0);

        assert!(store.is_applied("user-1", "track-1"));
        assert_eq!(store.get("user-1", &tile).unwrap().visit_count, 1);
    }

    #[test]
    fn test_plans_from_same_snapshot_both_count() {
        let mut store = MemoryExplorationStore::new();
        let tile = TileCoordinate::new(5, 5, 16);

        let first = plan_for(&store, "track-1", &[tile], day(1));
        let second = plan_for(&store, "track-2", &[tile], day(2));
        store.apply_exploration_plan(&first).unwrap();
        store.apply_exploration_plan(&second).unwrap();

        let record = store.get("user-1", &tile).unwrap();
        assert_eq!(record.visit_count, 2);
        assert_eq!(record.first_explored_at, day(1));
        assert_eq!(record.last_visited_at, day(2));
    }

    #[test]
    fn test_users_are_isolated() {
        let store = MemoryExplorationStore::new();
        assert!(store.load_exploration_records("nobody").unwrap().is_empty());
        assert_eq!(store.explored_tile_count("nobody"), 0);
    }
}
