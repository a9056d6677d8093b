//! Analyze a batch of rides in parallel.
//!
//! Run with: cargo run --example batch_tracks --features parallel

use chrono::{Duration, TimeZone, Utc};
use cyclefog_engine::{analyze_tracks, analyze_tracks_parallel, EngineConfig, GpsFix};
use std::time::Instant;

fn main() {
    println!("Batch Track Analysis Example\n");

    let start = Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap();
    let config = EngineConfig::default();

    // 200 rides of 2000 fixes around three cities
    let origins = [(52.5200, 13.4050), (48.8566, 2.3522), (51.5074, -0.1278)];
    let tracks: Vec<Vec<GpsFix>> = (0..200)
        .map(|n| {
            let (lat, lng) = origins[n % origins.len()];
            let heading = n as f64 * 0.1;
            (0..2000)
                .map(|i| {
                    let step = i as f64 * 0.0001;
                    GpsFix::new(
                        lat + step * heading.cos(),
                        lng + step * heading.sin(),
                        start + Duration::seconds(i as i64),
                    )
                    .with_altitude(40.0 + ((i + n) % 25) as f64)
                })
                .collect()
        })
        .collect();

    println!("Created {} tracks\n", tracks.len());

    let timer = Instant::now();
    let sequential = analyze_tracks(&tracks, &config);
    println!("Sequential: {:?}", timer.elapsed());

    let timer = Instant::now();
    let parallel = analyze_tracks_parallel(&tracks, &config);
    println!("Parallel:   {:?}\n", timer.elapsed());

    assert_eq!(sequential, parallel);

    let reports: Vec<_> = parallel.into_iter().filter_map(Result::ok).collect();
    let distance: f64 = reports.iter().map(|r| r.metrics.total_distance_meters).sum();
    let tiles: usize = reports.iter().map(|r| r.tiles.len()).sum();
    println!("Total distance: {:.1}km", distance / 1000.0);
    println!("Total tiles (per-track distinct): {}", tiles);
}
