//! Tile coverage of tracks and bounding boxes.
//!
//! - [`tiles_for_track`] lists the distinct tiles a track passes through, in
//!   the order the track first enters them.
//! - [`tiles_in_bounds`] enumerates every tile covering a bounding box.
//!
//! Bounding-box enumeration grows with `(Δx + 1) · (Δy + 1)`. It is lazy:
//! check [`TileRange::tile_count`] before collecting a range for a large box
//! at a high zoom level.

use std::collections::HashSet;

use crate::error::Result;
use crate::tiles::{check_zoom, to_tile};
use crate::{BoundingBox, GeoPoint, TileCoordinate};

/// Distinct tiles touched by a track at `zoom`, in order of first occurrence.
///
/// A track that lingers in one cell yields that cell once. Empty input gives
/// an empty result.
///
/// # Errors
///
/// [`GeoError::InvalidZoom`](crate::GeoError::InvalidZoom) for any input
/// length, including an empty track. Otherwise fails on the first point that
/// cannot be projected (see [`tiles::to_tile`](crate::tiles::to_tile)); no
/// partial list is returned.
///
/// # Example
///
/// ```rust
/// use cyclefog_engine::{GeoPoint, coverage};
///
/// let track = vec![
///     GeoPoint::new(52.52000, 13.40500),
///     GeoPoint::new(52.52001, 13.40501),
///     GeoPoint::new(52.52002, 13.40502),
/// ];
/// let tiles = coverage::tiles_for_track(&track, 16).unwrap();
/// assert_eq!(tiles.len(), 1);
/// ```
pub fn tiles_for_track(points: &[GeoPoint], zoom: u8) -> Result<Vec<TileCoordinate>> {
    check_zoom(zoom)?;

    let mut seen = HashSet::new();
    let mut tiles = Vec::new();

    for point in points {
        let tile = to_tile(point, zoom)?;
        if seen.insert(tile) {
            tiles.push(tile);
        }
    }

    Ok(tiles)
}

/// Every tile covering `bounds` at `zoom`.
///
/// The range spans from the tile under the north-west corner to the tile
/// under the south-east corner, inclusive. Tiles are yielded by ascending `x`,
/// and by ascending `y` within each `x`.
///
/// # Errors
///
/// * [`GeoError::InvalidBounds`](crate::GeoError::InvalidBounds) if
///   `north <= south` or the box crosses the antimeridian (`west >= east`).
/// * [`GeoError::InvalidCoordinate`](crate::GeoError::InvalidCoordinate) if a
///   corner lies outside the Web Mercator band.
///
/// Both are reported before any tile is produced.
///
/// # Example
///
/// ```rust
/// use cyclefog_engine::{BoundingBox, coverage};
///
/// let berlin = BoundingBox::new(52.55, 52.50, 13.45, 13.35);
/// let range = coverage::tiles_in_bounds(&berlin, 12).unwrap();
/// assert!(range.tile_count() < 100);
/// let tiles: Vec<_> = range.collect();
/// assert!(tiles.iter().all(|t| t.zoom == 12));
/// ```
pub fn tiles_in_bounds(bounds: &BoundingBox, zoom: u8) -> Result<TileRange> {
    bounds.validate()?;

    let north_west = to_tile(&GeoPoint::new(bounds.north, bounds.west), zoom)?;
    let south_east = to_tile(&GeoPoint::new(bounds.south, bounds.east), zoom)?;

    Ok(TileRange::new(
        north_west.x,
        south_east.x,
        north_west.y,
        south_east.y,
        zoom,
    ))
}

/// Closed rectangle of tiles, iterated column by column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRange {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
    zoom: u8,
    next_x: u32,
    next_y: u32,
    remaining: u64,
}

impl TileRange {
    fn new(min_x: u32, max_x: u32, min_y: u32, max_y: u32, zoom: u8) -> Self {
        let columns = (max_x - min_x) as u64 + 1;
        let rows = (max_y - min_y) as u64 + 1;
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            zoom,
            next_x: min_x,
            next_y: min_y,
            remaining: columns * rows,
        }
    }

    /// Tiles not yet yielded.
    pub fn tile_count(&self) -> u64 {
        self.remaining
    }

    /// The range's north-west and south-east tiles.
    pub fn corners(&self) -> (TileCoordinate, TileCoordinate) {
        (
            TileCoordinate::new(self.min_x, self.min_y, self.zoom),
            TileCoordinate::new(self.max_x, self.max_y, self.zoom),
        )
    }
}

impl Iterator for TileRange {
    type Item = TileCoordinate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let tile = TileCoordinate::new(self.next_x, self.next_y, self.zoom);
        self.remaining -= 1;

        if self.next_y == self.max_y {
            self.next_y = self.min_y;
            self.next_x = self.next_x.saturating_add(1);
        } else {
            self.next_y += 1;
        }

        Some(tile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoError;

    /// Box lying strictly inside the tile rectangle `[x0, x1] x [y0, y1]`.
    fn box_inside(x0: u32, y0: u32, x1: u32, y1: u32, zoom: u8) -> BoundingBox {
        let nw = TileCoordinate::new(x0, y0, zoom).north_west().unwrap();
        let se = TileCoordinate::new(x1 + 1, y1 + 1, zoom).north_west().unwrap();
        let inset = 1e-6;
        BoundingBox::new(
            nw.latitude - inset,
            se.latitude + inset,
            se.longitude - inset,
            nw.longitude + inset,
        )
    }

    #[test]
    fn test_tiles_for_track_empty() {
        assert!(tiles_for_track(&[], 16).unwrap().is_empty());
    }

    #[test]
    fn test_tiles_for_track_zoom_checked_for_empty_track() {
        assert_eq!(tiles_for_track(&[], 31), Err(GeoError::InvalidZoom(31)));
        assert_eq!(
            tiles_for_track(&[GeoPoint::new(52.52, 13.40)], 31),
            Err(GeoError::InvalidZoom(31))
        );
    }

    #[test]
    fn test_tiles_for_track_single_tile() {
        let track: Vec<GeoPoint> = (0..5)
            .map(|i| GeoPoint::new(52.5200 + i as f64 * 1e-5, 13.4050 + i as f64 * 1e-5))
            .collect();
        let tiles = tiles_for_track(&track, 16).unwrap();
        assert_eq!(tiles.len(), 1);
    }

    #[test]
    fn test_tiles_for_track_first_occurrence_order() {
        let zoom = 10;
        let a = GeoPoint::new(52.52, 13.40);
        let b = GeoPoint::new(48.85, 2.35);
        let c = GeoPoint::new(52.37, 4.90);
        let track = vec![a, b, a, c, b, c];

        let tiles = tiles_for_track(&track, zoom).unwrap();
        let expected: Vec<TileCoordinate> = [a, b, c]
            .iter()
            .map(|p| to_tile(p, zoom).unwrap())
            .collect();
        assert_eq!(tiles, expected);
    }

    #[test]
    fn test_tiles_for_track_rejects_invalid_point() {
        let track = vec![GeoPoint::new(52.52, 13.40), GeoPoint::new(95.0, 13.40)];
        assert!(matches!(
            tiles_for_track(&track, 16),
            Err(GeoError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_tiles_in_bounds_rectangle() {
        let bounds = box_inside(2, 1, 4, 2, 3);
        let range = tiles_in_bounds(&bounds, 3).unwrap();
        assert_eq!(range.tile_count(), 6);

        let tiles: Vec<TileCoordinate> = range.collect();
        let expected: Vec<TileCoordinate> = [(2, 1), (2, 2), (3, 1), (3, 2), (4, 1), (4, 2)]
            .iter()
            .map(|&(x, y)| TileCoordinate::new(x, y, 3))
            .collect();
        assert_eq!(tiles, expected);
    }

    #[test]
    fn test_tiles_in_bounds_edges_on_tile_lines() {
        // Edges exactly on the grid lines around x 2..=4, y 1..=2: the east
        // and south edges belong to the next column and row.
        let nw = TileCoordinate::new(2, 1, 3).north_west().unwrap();
        let se = TileCoordinate::new(5, 3, 3).north_west().unwrap();
        let bounds = BoundingBox::new(nw.latitude, se.latitude, se.longitude, nw.longitude);

        let range = tiles_in_bounds(&bounds, 3).unwrap();
        assert_eq!(
            range.corners(),
            (TileCoordinate::new(2, 1, 3), TileCoordinate::new(5, 3, 3))
        );
        assert_eq!(range.tile_count(), 12);
    }

    #[test]
    fn test_tiles_in_bounds_single_tile() {
        let bounds = box_inside(5, 5, 5, 5, 4);
        let tiles: Vec<_> = tiles_in_bounds(&bounds, 4).unwrap().collect();
        assert_eq!(tiles, vec![TileCoordinate::new(5, 5, 4)]);
    }

    #[test]
    fn test_tiles_in_bounds_rejects_inverted_box() {
        let bounds = BoundingBox::new(10.0, 20.0, 5.0, 0.0);
        assert!(matches!(
            tiles_in_bounds(&bounds, 5),
            Err(GeoError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_tiles_in_bounds_rejects_antimeridian() {
        let bounds = BoundingBox::new(10.0, 0.0, -170.0, 170.0);
        assert!(matches!(
            tiles_in_bounds(&bounds, 5),
            Err(GeoError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_tiles_in_bounds_rejects_polar_box() {
        let bounds = BoundingBox::new(89.0, 80.0, 10.0, 0.0);
        assert!(matches!(
            tiles_in_bounds(&bounds, 5),
            Err(GeoError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_tile_range_size_hint_tracks_progress() {
        let mut range = tiles_in_bounds(&box_inside(0, 0, 2, 2, 4), 4).unwrap();
        assert_eq!(range.size_hint(), (9, Some(9)));
        range.next();
        assert_eq!(range.tile_count(), 8);
        assert_eq!(range.count(), 8);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_enumeration_is_unique_and_counted(
                south in -80.0..79.0_f64,
                height in 0.01..1.0_f64,
                west in -179.0..178.0_f64,
                width in 0.01..1.0_f64,
                zoom in 0u8..=12
            ) {
                let bounds = BoundingBox::new(south + height, south, west + width, west);
                let range = tiles_in_bounds(&bounds, zoom)?;
                let expected = range.tile_count();
                let tiles: Vec<_> = range.collect();
                prop_assert_eq!(tiles.len() as u64, expected);

                let unique: HashSet<_> = tiles.iter().collect();
                prop_assert_eq!(unique.len(), tiles.len());

                let track_tiles = tiles_for_track(
                    &[GeoPoint::new(bounds.north, bounds.west), GeoPoint::new(bounds.south, bounds.east)],
                    zoom,
                )?;
                for tile in track_tiles {
                    prop_assert!(tiles.contains(&tile));
                }
            }
        }
    }
}
