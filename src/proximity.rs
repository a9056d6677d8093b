//! Radius queries over a set of identified locations.
//!
//! Used for proximity alerts: which ride meeting points (or other riders)
//! lie within a few hundred meters of the current position. Locations are
//! held in an R-tree keyed on `[lng, lat]`; a degree-padded envelope search
//! pre-filters candidates before the exact haversine check. Envelopes that
//! cross the antimeridian are split in two.

use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::{haversine_distance, EARTH_RADIUS_METERS};
use crate::GeoPoint;

/// Padding applied to the search envelope on top of the spherical extent.
const ENVELOPE_MARGIN: f64 = 1.1;

/// A location held by the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedLocation {
    pub id: String,
    pub point: GeoPoint,
}

impl RTreeObject for IndexedLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.point.longitude, self.point.latitude])
    }
}

/// A location found by [`ProximityIndex::within`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NearbyLocation {
    pub id: String,
    pub distance_meters: f64,
}

/// Spatial index answering "what is within R meters of here".
///
/// # Example
///
/// ```rust
/// use cyclefog_engine::{GeoPoint, ProximityIndex};
///
/// let index = ProximityIndex::new(vec![
///     ("ride-1".to_string(), GeoPoint::new(52.5205, 13.4050)),
///     ("ride-2".to_string(), GeoPoint::new(48.8566, 2.3522)),
/// ]);
///
/// let nearby = index.within(&GeoPoint::new(52.5200, 13.4050), 500.0);
/// assert_eq!(nearby.len(), 1);
/// assert_eq!(nearby[0].id, "ride-1");
/// ```
#[derive(Debug, Default)]
pub struct ProximityIndex {
    tree: RTree<IndexedLocation>,
}

impl ProximityIndex {
    /// Bulk-load an index. Locations with invalid coordinates are skipped.
    pub fn new(locations: Vec<(String, GeoPoint)>) -> Self {
        let entries: Vec<IndexedLocation> = locations
            .into_iter()
            .filter(|(_, point)| point.is_valid())
            .map(|(id, point)| IndexedLocation { id, point })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Add one location. Returns `false` if its coordinates are invalid.
    pub fn insert(&mut self, id: &str, point: GeoPoint) -> bool {
        if !point.is_valid() {
            return false;
        }
        self.tree.insert(IndexedLocation {
            id: id.to_string(),
            point,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locations within `radius_meters` of `center`, nearest first.
    ///
    /// Agrees with [`is_within_distance`](crate::geo_utils::is_within_distance)
    /// for every indexed location, including across the antimeridian and
    /// near the poles.
    pub fn within(&self, center: &GeoPoint, radius_meters: f64) -> Vec<NearbyLocation> {
        if !center.is_valid() || !(radius_meters >= 0.0) {
            return vec![];
        }

        let mut nearby: Vec<NearbyLocation> = search_envelopes(center, radius_meters)
            .iter()
            .flat_map(|envelope| self.tree.locate_in_envelope(envelope))
            .filter_map(|location| {
                let distance_meters = haversine_distance(center, &location.point);
                (distance_meters <= radius_meters).then(|| NearbyLocation {
                    id: location.id.clone(),
                    distance_meters,
                })
            })
            .collect();

        nearby.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        nearby
    }
}

/// Degree boxes that together cover the circle of `radius_meters` around
/// `center`. Non-overlapping, so no location is found twice.
fn search_envelopes(center: &GeoPoint, radius_meters: f64) -> Vec<AABB<[f64; 2]>> {
    let lat_pad = (radius_meters / EARTH_RADIUS_METERS).to_degrees() * ENVELOPE_MARGIN;
    let south = (center.latitude - lat_pad).max(-90.0);
    let north = (center.latitude + lat_pad).min(90.0);

    // Longitude degrees shrink towards the poles; pad for the most poleward
    // latitude the circle reaches.
    let poleward = center.latitude.abs() + lat_pad;
    let lng_pad = if poleward >= 90.0 {
        f64::INFINITY
    } else {
        lat_pad / poleward.to_radians().cos()
    };

    if lng_pad >= 180.0 {
        return vec![AABB::from_corners([-180.0, south], [180.0, north])];
    }

    let west = center.longitude - lng_pad;
    let east = center.longitude + lng_pad;
    if west < -180.0 {
        vec![
            AABB::from_corners([-180.0, south], [east, north]),
            AABB::from_corners([west + 360.0, south], [180.0, north]),
        ]
    } else if east > 180.0 {
        vec![
            AABB::from_corners([west, south], [180.0, north]),
            AABB::from_corners([-180.0, south], [east - 360.0, north]),
        ]
    } else {
        vec![AABB::from_corners([west, south], [east, north])]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn berlin_index() -> ProximityIndex {
        ProximityIndex::new(vec![
            ("far".to_string(), GeoPoint::new(52.5300, 13.4050)),    // ~1.1 km
            ("near".to_string(), GeoPoint::new(52.5210, 13.4050)),   // ~111 m
            ("nearer".to_string(), GeoPoint::new(52.5202, 13.4050)), // ~22 m
            ("paris".to_string(), GeoPoint::new(48.8566, 2.3522)),
        ])
    }

    #[test]
    fn test_within_sorted_by_distance() {
        let nearby = berlin_index().within(&GeoPoint::new(52.5200, 13.4050), 500.0);
        let ids: Vec<&str> = nearby.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["nearer", "near"]);
        assert!(nearby[0].distance_meters < nearby[1].distance_meters);
    }

    #[test]
    fn test_within_larger_radius() {
        let nearby = berlin_index().within(&GeoPoint::new(52.5200, 13.4050), 2_000.0);
        assert_eq!(nearby.len(), 3);
    }

    #[test]
    fn test_radius_boundary_east_west() {
        // ~500 m east at this latitude is ~0.00737 degrees of longitude
        let mut index = ProximityIndex::default();
        assert!(index.insert("east", GeoPoint::new(52.5200, 13.4120)));
        let nearby = index.within(&GeoPoint::new(52.5200, 13.4050), 500.0);
        assert_eq!(nearby.len(), 1);
        assert!(nearby[0].distance_meters > 450.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let mut index = berlin_index();
        assert!(!index.insert("bad", GeoPoint::new(120.0, 0.0)));
        assert_eq!(index.len(), 4);
        assert!(index.within(&GeoPoint::new(f64::NAN, 0.0), 500.0).is_empty());
        assert!(index.within(&GeoPoint::new(52.52, 13.405), -1.0).is_empty());
    }

    #[test]
    fn test_empty_index() {
        let index = ProximityIndex::new(vec![]);
        assert!(index.is_empty());
        assert!(index.within(&GeoPoint::new(52.52, 13.405), 500.0).is_empty());
    }

    #[test]
    fn test_within_across_antimeridian() {
        let mut index = ProximityIndex::default();
        index.insert("east-of-line", GeoPoint::new(-17.0, -179.999));
        index.insert("west-of-line", GeoPoint::new(-17.0, 179.998));

        let center = GeoPoint::new(-17.0, 179.999);
        let nearby = index.within(&center, 500.0);
        let ids: Vec<&str> = nearby.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["west-of-line", "east-of-line"]);

        let from_other_side = index.within(&GeoPoint::new(-17.0, -179.999), 500.0);
        assert_eq!(from_other_side.len(), 2);
    }

    #[test]
    fn test_within_near_pole() {
        let mut index = ProximityIndex::default();
        index.insert("ice", GeoPoint::new(85.0, 10.0505));
        index.insert("across-pole", GeoPoint::new(89.999, -170.0));

        let nearby = index.within(&GeoPoint::new(85.0, 10.0), 500.0);
        assert_eq!(nearby.len(), 1);
        assert!(nearby[0].distance_meters > 450.0);

        // ~220 m apart over the pole
        let nearby = index.within(&GeoPoint::new(89.999, 10.0), 500.0);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].id, "across-pole");
    }

    #[test]
    fn test_within_matches_pairwise_distance() {
        // A cluster straddling the antimeridian at high latitude
        let points: Vec<GeoPoint> = (0..200)
            .map(|i| {
                let t = i as f64;
                let lng = 179.99 + (t * 0.73).cos() * 0.02;
                let lng = if lng > 180.0 { lng - 360.0 } else { lng };
                GeoPoint::new(84.9 + (t * 0.37).sin() * 0.05, lng)
            })
            .collect();
        let index = ProximityIndex::new(
            points.iter().enumerate().map(|(i, p)| (i.to_string(), *p)).collect(),
        );

        for center in points.iter().step_by(17) {
            let expected = points
                .iter()
                .filter(|p| crate::geo_utils::is_within_distance(center, p, 800.0))
                .count();
            assert_eq!(index.within(center, 800.0).len(), expected);
        }
    }
}
