//! Error types for the exploration engine.
//!
//! Every fallible operation reports the offending input at the boundary of
//! the call that received it. Nothing is clamped or retried internally.

use thiserror::Error;

/// Errors raised by coordinate projection, tile enumeration and
/// exploration reconciliation.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
pub enum GeoError {
    /// Latitude/longitude is non-finite, outside [-90, 90] / [-180, 180],
    /// or (for tile projection) outside the Web Mercator band.
    #[error("invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// North edge not above the south edge, or a box crossing the antimeridian.
    #[error(
        "invalid bounding box (north {north}, south {south}, east {east}, west {west}): \
         north must exceed south and west must be less than east"
    )]
    InvalidBounds {
        north: f64,
        south: f64,
        east: f64,
        west: f64,
    },

    #[error("invalid zoom level {0} (maximum is {max})", max = crate::tiles::MAX_ZOOM)]
    InvalidZoom(u8),

    /// Tile index outside the `2^zoom x 2^zoom` grid.
    #[error("tile ({x}, {y}) is outside the grid at zoom {zoom}")]
    InvalidTile { x: u32, y: u32, zoom: u8 },

    #[error("tile at zoom {found} does not match exploration zoom {expected}")]
    ZoomMismatch { expected: u8, found: u8 },

    /// An existing exploration record belongs to a different user.
    #[error("exploration record of user {owner} passed for user {user_id}")]
    ForeignRecord { user_id: String, owner: String },

    #[error("timestamp {0}ms is out of range")]
    InvalidTimestamp(i64),

    /// A bounds enumeration would exceed the caller's tile limit.
    #[error("{count} tiles requested, limit is {limit}")]
    TooManyTiles { count: u64, limit: u64 },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GeoError>;
