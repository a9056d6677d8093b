//! Record two rides for one user and watch the fog lift.
//!
//! Run with: cargo run --example explore_track

use chrono::{Duration, TimeZone, Utc};
use cyclefog_engine::{
    coverage, record_track, BoundingBox, EngineConfig, GpsFix, MemoryExplorationStore,
    ProximityIndex,
};

fn main() {
    println!("Exploration Example\n");

    let config = EngineConfig::default();
    let mut store = MemoryExplorationStore::new();
    let morning = Utc.with_ymd_and_hms(2024, 6, 1, 7, 30, 0).unwrap();

    // Tiergarten to Alexanderplatz, one fix every 5 seconds
    let ride_east: Vec<GpsFix> = (0..120)
        .map(|i| {
            let t = morning + Duration::seconds(i * 5);
            GpsFix::new(52.5145 + i as f64 * 0.00005, 13.3500 + i as f64 * 0.0006, t)
                .with_altitude(34.0 + (i % 7) as f64)
                .with_accuracy(if i == 60 { 180.0 } else { 6.0 })
        })
        .collect();

    let first = record_track(&mut store, "rider-1", "ride-1", &ride_east, morning, &config)
        .expect("ride-1 should record");
    let report = &first.report;
    println!("ride-1:");
    println!("   Distance: {:.0}m", report.metrics.total_distance_meters);
    println!("   Elevation gain: {:.0}m", report.metrics.elevation_gain_meters);
    println!("   Fixes: {} accepted, {} rejected", report.accepted_fixes, report.rejected_fixes);
    if let Some(duration) = report.duration() {
        println!("   Duration: {}s", duration.num_seconds());
    }
    println!("   New tiles: {}\n", first.plan.new_tile_count());

    // Same ride back two days later, then a short detour north
    let evening = morning + Duration::days(2) + Duration::hours(11);
    let mut ride_back: Vec<GpsFix> = ride_east
        .iter()
        .rev()
        .enumerate()
        .map(|(i, fix)| GpsFix {
            timestamp: evening + Duration::seconds(i as i64 * 5),
            ..fix.clone()
        })
        .collect();
    let detour_start = evening + Duration::seconds(ride_back.len() as i64 * 5);
    ride_back.extend((0..40).map(|i| {
        GpsFix::new(52.5145 + i as f64 * 0.0008, 13.3500, detour_start + Duration::seconds(i * 5))
    }));

    let second = record_track(&mut store, "rider-1", "ride-2", &ride_back, evening, &config)
        .expect("ride-2 should record");
    println!("ride-2:");
    println!("   New tiles: {}", second.plan.new_tile_count());
    println!("   Revisited tiles: {}\n", second.plan.revisited_tile_count());

    println!("rider-1 has explored {} tiles\n", store.explored_tile_count("rider-1"));

    // Fog overlay for the current map viewport
    let viewport = BoundingBox::new(52.54, 52.50, 13.43, 13.33);
    let range = coverage::tiles_in_bounds(&viewport, config.exploration_zoom)
        .expect("viewport is valid");
    let total = range.tile_count();
    let explored = range
        .filter(|tile| store.get("rider-1", tile).is_some())
        .count();
    println!("Viewport: {} of {} tiles explored\n", explored, total);

    // Proximity alert for upcoming group rides
    let meeting_points = ProximityIndex::new(vec![
        ("sunday-social".to_string(), ride_east[10].point()),
        ("gravel-crew".to_string(), ride_east[100].point()),
    ]);
    let here = ride_east[12].point();
    for nearby in meeting_points.within(&here, config.proximity_threshold_meters) {
        println!("Nearby ride: {} ({:.0}m away)", nearby.id, nearby.distance_meters);
    }
}
