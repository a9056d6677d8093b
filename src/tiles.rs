//! # Tile Indexer
//!
//! Bidirectional mapping between WGS84 coordinates and the Web Mercator
//! slippy-map tile grid used by the exploration ("fog of war") map.
//!
//! At zoom `z` the world is split into `2^z x 2^z` tiles. Tile `(0, 0)` is the
//! north-west corner of the map; `x` grows eastwards and `y` southwards.
//!
//! ## Example
//!
//! ```rust
//! use cyclefog_engine::{GeoPoint, tiles};
//!
//! let center = tiles::to_tile(&GeoPoint::new(0.0, 0.0), 1).unwrap();
//! assert_eq!((center.x, center.y, center.zoom), (1, 1, 1));
//!
//! // The inverse projection yields the tile's north-west corner
//! let corner = tiles::to_lat_lng(&center).unwrap();
//! assert_eq!(corner.longitude, 0.0);
//! assert!(corner.latitude.abs() < 1e-9);
//! ```
//!
//! The forward mapping is lossy: `to_lat_lng(to_tile(p, z))` is the corner of
//! the cell containing `p`, not `p` itself. Projecting a tile's own corner
//! always lands back in that tile.

use std::f64::consts::PI;

use crate::error::{GeoError, Result};
use crate::{BoundingBox, GeoPoint, TileCoordinate};

/// Highest supported zoom level. Tile indices stay within `u32` and are
/// exactly representable as `f64` up to this level.
pub const MAX_ZOOM: u8 = 30;

/// Northern limit of the Web Mercator projection, `atan(sinh(π))` in degrees.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// Tolerance, as a fraction of the world width, below a tile edge that still
/// counts as the edge.
const EDGE_EPSILON: f64 = 1e-12;

/// Slack on the Mercator latitude limit, in degrees. The inverse projection
/// of a row-0 corner can land an ulp beyond the constant.
const LATITUDE_SLACK: f64 = 1e-9;

/// Number of tiles along one axis at `zoom`.
#[inline]
pub fn tiles_per_axis(zoom: u8) -> u64 {
    1u64 << zoom
}

pub(crate) fn check_zoom(zoom: u8) -> Result<()> {
    if zoom > MAX_ZOOM {
        return Err(GeoError::InvalidZoom(zoom));
    }
    Ok(())
}

/// Map a fractional grid position to its cell index.
///
/// Positions a hair below an integer edge (floating error from the inverse
/// projection) snap onto the edge; the far edge of the world belongs to the
/// last cell.
#[inline]
fn cell_index(position: f64, n: u64) -> u32 {
    let index = (position + EDGE_EPSILON * n as f64).floor().max(0.0) as u64;
    index.min(n - 1) as u32
}

/// Project a coordinate onto the tile grid at `zoom`.
///
/// # Errors
///
/// * [`GeoError::InvalidCoordinate`] if the point is non-finite, outside the
///   WGS84 ranges, or its latitude lies outside the Web Mercator band
///   (`|lat| > MAX_MERCATOR_LATITUDE`).
/// * [`GeoError::InvalidZoom`] if `zoom > MAX_ZOOM`.
///
/// # Example
///
/// ```rust
/// use cyclefog_engine::{GeoPoint, GeoError, tiles};
///
/// let berlin = GeoPoint::new(52.5200, 13.4050);
/// let tile = tiles::to_tile(&berlin, 16).unwrap();
/// assert_eq!(tile.zoom, 16);
///
/// let pole = GeoPoint::new(89.0, 0.0);
/// assert!(matches!(tiles::to_tile(&pole, 16), Err(GeoError::InvalidCoordinate { .. })));
/// ```
pub fn to_tile(point: &GeoPoint, zoom: u8) -> Result<TileCoordinate> {
    check_zoom(zoom)?;
    if !point.is_valid() || point.latitude.abs() > MAX_MERCATOR_LATITUDE + LATITUDE_SLACK {
        return Err(GeoError::InvalidCoordinate {
            latitude: point.latitude,
            longitude: point.longitude,
        });
    }

    let n = tiles_per_axis(zoom);
    let n_f = n as f64;

    let x = (point.longitude + 180.0) / 360.0 * n_f;

    let lat_rad = point.latitude.to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n_f;

    Ok(TileCoordinate {
        x: cell_index(x, n),
        y: cell_index(y, n),
        zoom,
    })
}

/// Inverse projection: the north-west corner of `tile`.
///
/// # Errors
///
/// [`GeoError::InvalidTile`] if the tile lies outside its zoom level's grid,
/// [`GeoError::InvalidZoom`] if its zoom exceeds [`MAX_ZOOM`].
pub fn to_lat_lng(tile: &TileCoordinate) -> Result<GeoPoint> {
    check_zoom(tile.zoom)?;
    if !tile.is_valid() {
        return Err(GeoError::InvalidTile {
            x: tile.x,
            y: tile.y,
            zoom: tile.zoom,
        });
    }
    Ok(grid_corner(tile.x as f64, tile.y as f64, tile.zoom))
}

/// Coordinate of a (possibly fractional) grid position. Callers validate.
fn grid_corner(x: f64, y: f64, zoom: u8) -> GeoPoint {
    let n = tiles_per_axis(zoom) as f64;
    let longitude = x / n * 360.0 - 180.0;
    let latitude = (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
    GeoPoint::new(latitude, longitude)
}

impl TileCoordinate {
    /// Create a tile coordinate. Use [`TileCoordinate::is_valid`] to check it
    /// against the grid.
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// True if `zoom <= MAX_ZOOM` and both indices are below `2^zoom`.
    pub fn is_valid(&self) -> bool {
        if self.zoom > MAX_ZOOM {
            return false;
        }
        let n = tiles_per_axis(self.zoom);
        (self.x as u64) < n && (self.y as u64) < n
    }

    /// North-west corner of the tile.
    pub fn north_west(&self) -> Result<GeoPoint> {
        to_lat_lng(self)
    }

    /// Geographic center of the tile (in projected space, so the latitude is
    /// the Mercator midpoint rather than the arithmetic mean of the edges).
    pub fn center(&self) -> Result<GeoPoint> {
        to_lat_lng(self)?;
        Ok(grid_corner(
            self.x as f64 + 0.5,
            self.y as f64 + 0.5,
            self.zoom,
        ))
    }

    /// The tile's own extent as a bounding box.
    pub fn bounds(&self) -> Result<BoundingBox> {
        let nw = to_lat_lng(self)?;
        let se = grid_corner(self.x as f64 + 1.0, self.y as f64 + 1.0, self.zoom);
        Ok(BoundingBox {
            north: nw.latitude,
            south: se.latitude,
            east: se.longitude,
            west: nw.longitude,
        })
    }
}
